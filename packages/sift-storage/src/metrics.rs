use crate::{Result, db::Db, models::MetricPoint};

/// Bulk-persists flushed metric rows. Non-finite values must be filtered by
/// the caller before they reach this table.
pub async fn insert_points(db: &Db, points: &[MetricPoint]) -> Result<u64> {
	if points.is_empty() {
		return Ok(0);
	}

	let mut builder = sqlx::QueryBuilder::new(
		"INSERT INTO metric_points (bucket_start, name, value, dimensions) ",
	);

	builder.push_values(points, |mut row, point| {
		row.push_bind(point.bucket_start)
			.push_bind(&point.name)
			.push_bind(point.value)
			.push_bind(&point.dimensions);
	});

	let result = builder.build().execute(&db.pool).await?;

	Ok(result.rows_affected())
}
