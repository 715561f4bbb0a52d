//! RFC-4180-style record reader for taxonomy authoring files. Quoted
//! fields may contain the delimiter, doubled quotes, and line breaks; the
//! delimiter is auto-detected between comma and semicolon.

use std::collections::BTreeMap;

use crate::{
	Error, Result,
	document::{RelationEntry, SkillEntry},
};

/// Picks the delimiter by counting separators outside quotes in the first
/// physical line. Semicolon wins only when it strictly outnumbers commas
/// (European spreadsheet exports).
pub fn detect_delimiter(input: &str) -> char {
	let mut in_quotes = false;
	let mut commas = 0usize;
	let mut semicolons = 0usize;

	for ch in input.chars() {
		match ch {
			'"' => in_quotes = !in_quotes,
			'\n' if !in_quotes => break,
			',' if !in_quotes => commas += 1,
			';' if !in_quotes => semicolons += 1,
			_ => {},
		}
	}

	if semicolons > commas { ';' } else { ',' }
}

/// Parses the whole input into records of fields. Empty physical lines
/// between records are skipped; a trailing newline does not produce an
/// empty record.
pub fn parse_records(input: &str) -> Result<Vec<Vec<String>>> {
	let delimiter = detect_delimiter(input);

	parse_records_with(input, delimiter)
}

pub fn parse_records_with(input: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
	let mut records = Vec::new();
	let mut record: Vec<String> = Vec::new();
	let mut field = String::new();
	let mut in_quotes = false;
	// True once the current field started with an opening quote; a closing
	// quote then only ends the field, never re-opens it.
	let mut was_quoted = false;
	let mut line = 1usize;
	let mut chars = input.chars().peekable();

	while let Some(ch) = chars.next() {
		if in_quotes {
			match ch {
				'"' =>
					if chars.peek() == Some(&'"') {
						chars.next();
						field.push('"');
					} else {
						in_quotes = false;
					},
				'\n' => {
					line += 1;
					field.push(ch);
				},
				_ => field.push(ch),
			}

			continue;
		}

		match ch {
			'"' if field.is_empty() && !was_quoted => {
				in_quotes = true;
				was_quoted = true;
			},
			'"' => {
				return Err(Error::Csv {
					line,
					message: "quote inside an unquoted field.".to_string(),
				});
			},
			'\r' => {
				// Bare CR is folded into the following LF; CRLF inside
				// quotes was already handled above.
			},
			'\n' => {
				line += 1;

				record.push(std::mem::take(&mut field));
				was_quoted = false;

				if record.len() > 1 || !record[0].is_empty() {
					records.push(std::mem::take(&mut record));
				} else {
					record.clear();
				}
			},
			ch if ch == delimiter => {
				record.push(std::mem::take(&mut field));
				was_quoted = false;
			},
			_ => field.push(ch),
		}
	}

	if in_quotes {
		return Err(Error::Csv { line, message: "unterminated quoted field.".to_string() });
	}
	if !field.is_empty() || !record.is_empty() {
		record.push(field);
		records.push(record);
	}

	Ok(records)
}

/// Maps `name,category,source,quality` records into skill entries. A header
/// row is recognized and skipped; bad rows are counted per reason.
pub fn skills_from_csv(input: &str) -> Result<(Vec<SkillEntry>, BTreeMap<String, u64>)> {
	let records = parse_records(input)?;
	let mut skills = Vec::new();
	let mut rejections = BTreeMap::new();

	for (index, record) in records.iter().enumerate() {
		if index == 0 && is_header(record, "name") {
			continue;
		}
		if record.is_empty() || record.len() > 4 {
			reject(&mut rejections, "bad_column_count");

			continue;
		}

		let name = record[0].trim();

		if name.is_empty() {
			reject(&mut rejections, "empty_name");

			continue;
		}

		let quality = match record.get(3).map(|raw| raw.trim()) {
			None | Some("") => None,
			Some(raw) => match raw.parse::<f64>() {
				Ok(value) if value.is_finite() && (0.0..=1.0).contains(&value) => Some(value),
				_ => {
					reject(&mut rejections, "invalid_quality");

					continue;
				},
			},
		};

		skills.push(SkillEntry {
			name: name.to_string(),
			category: non_empty(record.get(1)),
			source: non_empty(record.get(2)),
			quality,
		});
	}

	Ok((skills, rejections))
}

/// Maps `from,to,kind,weight,directed,source` records into relation
/// entries. Kind and weight validity is re-checked by document validation;
/// this pass only rejects rows it cannot shape at all.
pub fn relations_from_csv(input: &str) -> Result<(Vec<RelationEntry>, BTreeMap<String, u64>)> {
	let records = parse_records(input)?;
	let mut relations = Vec::new();
	let mut rejections = BTreeMap::new();

	for (index, record) in records.iter().enumerate() {
		if index == 0 && is_header(record, "from") {
			continue;
		}
		if record.len() < 4 || record.len() > 6 {
			reject(&mut rejections, "bad_column_count");

			continue;
		}

		let from = record[0].trim();
		let to = record[1].trim();

		if from.is_empty() || to.is_empty() {
			reject(&mut rejections, "empty_name");

			continue;
		}

		let Ok(weight) = record[3].trim().parse::<f64>() else {
			reject(&mut rejections, "invalid_weight");

			continue;
		};
		let directed = match record.get(4).map(|raw| raw.trim().to_lowercase()) {
			None => false,
			Some(raw) if raw.is_empty() || raw == "false" || raw == "0" => false,
			Some(raw) if raw == "true" || raw == "1" => true,
			Some(_) => {
				reject(&mut rejections, "invalid_directed_flag");

				continue;
			},
		};

		relations.push(RelationEntry {
			from: from.to_string(),
			to: to.to_string(),
			kind: record[2].trim().to_lowercase(),
			weight,
			directed,
			source: non_empty(record.get(5)),
		});
	}

	Ok((relations, rejections))
}

fn is_header(record: &[String], first_column: &str) -> bool {
	record.first().is_some_and(|field| field.trim().eq_ignore_ascii_case(first_column))
}

fn non_empty(field: Option<&String>) -> Option<String> {
	field.map(|raw| raw.trim()).filter(|raw| !raw.is_empty()).map(str::to_string)
}

fn reject(rejections: &mut BTreeMap<String, u64>, reason: &str) {
	*rejections.entry(reason.to_string()).or_insert(0) += 1;
}
