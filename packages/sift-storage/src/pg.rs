use sqlx::PgPool;

use sift_config::Metric;

use crate::{
	Error, Result,
	models::{self, BatchVectorQuery, IndexHit, TaggedHit, VectorQuery},
};

/// Vector and full-text search over one Postgres table with a pgvector (or VectorChord) column.
pub struct PgIndex {
	pub pool: PgPool,
	metric: Metric,
	partitions: Option<u32>,
	probe_setting: String,
	language: String,
	statements: Statements,
}

struct Statements {
	vector: String,
	vector_batch: String,
	lexical: String,
}

impl PgIndex {
	pub fn new(pool: PgPool, cfg: &sift_config::Postgres, metric: Metric) -> Result<Self> {
		for value in [&cfg.table, &cfg.id_column, &cfg.content_column, &cfg.embedding_column] {
			if !sift_config::is_sql_identifier(value) {
				return Err(Error::InvalidArgument(format!(
					"{value:?} is not a plain SQL identifier."
				)));
			}
		}

		Ok(Self {
			pool,
			metric,
			partitions: cfg.partitions,
			probe_setting: cfg.probe_setting.clone(),
			language: cfg.language.clone(),
			statements: Statements::render(cfg, metric),
		})
	}

	/// Partition count of the approximate index, when the deployment declares one.
	pub fn partitions(&self) -> Option<u32> {
		self.partitions
	}

	pub async fn search_vector(&self, query: VectorQuery<'_>) -> Result<Vec<IndexHit>> {
		let vec_text = vector_to_pg(query.vector);
		let mut tx = self.pool.begin().await?;

		if let Some(probe) = query.probe {
			self.apply_probe(&mut tx, probe).await?;
		}

		let rows: Vec<(String, String, f32)> = sqlx::query_as(self.statements.vector.as_str())
			.bind(vec_text.as_str())
			.bind(i64::from(query.top_k))
			.fetch_all(&mut *tx)
			.await?;

		tx.commit().await?;

		Ok(rows
			.into_iter()
			.map(|(id, content, distance)| IndexHit {
				id,
				content,
				score: models::similarity_from_distance(self.metric, distance),
			})
			.collect())
	}

	/// Runs every vector through one lateral join. Rows come back ordered by query index, then by
	/// ascending distance, with ties broken by id.
	pub async fn search_vector_batch(&self, query: BatchVectorQuery<'_>) -> Result<Vec<TaggedHit>> {
		if query.vectors.is_empty() {
			return Ok(Vec::new());
		}

		let vec_texts: Vec<String> = query.vectors.iter().map(|vec| vector_to_pg(vec)).collect();
		let mut tx = self.pool.begin().await?;

		if let Some(probe) = query.probe {
			self.apply_probe(&mut tx, probe).await?;
		}

		let rows: Vec<(i64, String, String, f32)> =
			sqlx::query_as(self.statements.vector_batch.as_str())
				.bind(vec_texts.as_slice())
				.bind(i64::from(query.candidate_limit))
				.fetch_all(&mut *tx)
				.await?;

		tx.commit().await?;

		let mut out = Vec::with_capacity(rows.len());

		for (query_index, id, content, distance) in rows {
			let query_index = usize::try_from(query_index).map_err(|_| {
				Error::MalformedResponse(format!("Query index {query_index} is negative."))
			})?;

			out.push(TaggedHit {
				query_index,
				hit: IndexHit {
					id,
					content,
					score: models::similarity_from_distance(self.metric, distance),
				},
			});
		}

		Ok(out)
	}

	/// Ranks rows matching the `websearch_to_tsquery` expression by `ts_rank_cd`.
	pub async fn search_lexical(&self, expression: &str, top_k: u32) -> Result<Vec<IndexHit>> {
		let rows: Vec<(String, String, f32)> = sqlx::query_as(self.statements.lexical.as_str())
			.bind(self.language.as_str())
			.bind(expression)
			.bind(i64::from(top_k))
			.fetch_all(&self.pool)
			.await?;

		Ok(rows.into_iter().map(|(id, content, score)| IndexHit { id, content, score }).collect())
	}

	// `set_config(.., true)` is the parameterized form of `SET LOCAL`; it ends with the transaction.
	async fn apply_probe(
		&self,
		tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
		probe: u32,
	) -> Result<()> {
		sqlx::query("SELECT set_config($1, $2, true)")
			.bind(self.probe_setting.as_str())
			.bind(probe.to_string())
			.execute(&mut **tx)
			.await?;

		Ok(())
	}
}

impl Statements {
	fn render(cfg: &sift_config::Postgres, metric: Metric) -> Self {
		let table = quote_ident(&cfg.table);
		let id = quote_ident(&cfg.id_column);
		let content = quote_ident(&cfg.content_column);
		let embedding = quote_ident(&cfg.embedding_column);
		let op = distance_operator(metric);
		let vector = format!(
			"\
SELECT {id}::text AS id, {content} AS content, ({embedding} {op} $1::text::vector)::real AS distance
FROM {table}
ORDER BY {embedding} {op} $1::text::vector, {id}
LIMIT $2"
		);
		let vector_batch = format!(
			"\
SELECT (q.ordinality - 1)::int8 AS query_index, hit.id, hit.content, hit.distance
FROM unnest($1::text[]) WITH ORDINALITY AS q(vec, ordinality)
CROSS JOIN LATERAL (
	SELECT
		{id}::text AS id,
		{content} AS content,
		({embedding} {op} q.vec::vector)::real AS distance
	FROM {table}
	ORDER BY {embedding} {op} q.vec::vector, {id}
	LIMIT $2
) AS hit
ORDER BY q.ordinality, hit.distance, hit.id"
		);
		let lexical = format!(
			"\
SELECT
	{id}::text AS id,
	{content} AS content,
	ts_rank_cd(to_tsvector($1::regconfig, {content}), query)::real AS score
FROM {table}, websearch_to_tsquery($1::regconfig, $2) AS query
WHERE to_tsvector($1::regconfig, {content}) @@ query
ORDER BY score DESC, id
LIMIT $3"
		);

		Self { vector, vector_batch, lexical }
	}
}

pub fn distance_operator(metric: Metric) -> &'static str {
	match metric {
		Metric::Cosine => "<=>",
		Metric::L2 => "<->",
		Metric::Ip => "<#>",
	}
}

pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

fn quote_ident(value: &str) -> String {
	value.split('.').map(|part| format!("\"{part}\"")).collect::<Vec<_>>().join(".")
}
