pub fn render_schema(vector_dim: u32) -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init).replace("<VECTOR_DIM>", &vector_dim.to_string())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let Some(path) = line.trim().strip_prefix("\\ir ") else {
			out.push_str(line);
			out.push('\n');

			continue;
		};

		match path.trim() {
			"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
			"tables/001_conversations.sql" =>
				out.push_str(include_str!("../../../sql/tables/001_conversations.sql")),
			"tables/002_conversation_members.sql" =>
				out.push_str(include_str!("../../../sql/tables/002_conversation_members.sql")),
			"tables/003_responses.sql" =>
				out.push_str(include_str!("../../../sql/tables/003_responses.sql")),
			"tables/004_response_embeddings.sql" =>
				out.push_str(include_str!("../../../sql/tables/004_response_embeddings.sql")),
			"tables/005_cluster_models.sql" =>
				out.push_str(include_str!("../../../sql/tables/005_cluster_models.sql")),
			"tables/006_themes.sql" => out.push_str(include_str!("../../../sql/tables/006_themes.sql")),
			"tables/007_consolidated_statements.sql" =>
				out.push_str(include_str!("../../../sql/tables/007_consolidated_statements.sql")),
			"tables/008_feedback_votes.sql" =>
				out.push_str(include_str!("../../../sql/tables/008_feedback_votes.sql")),
			"tables/009_analysis_jobs.sql" =>
				out.push_str(include_str!("../../../sql/tables/009_analysis_jobs.sql")),
			_ => out.push_str(line),
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn renders_every_include_with_the_vector_dimension() {
		let sql = render_schema(768);

		assert!(!sql.contains("\\ir "));
		assert!(!sql.contains("<VECTOR_DIM>"));
		assert!(sql.contains("vector(768)"));
		assert!(sql.contains("CREATE UNIQUE INDEX IF NOT EXISTS idx_analysis_jobs_one_active"));
	}
}
