//! Routing policy: the system text that tells the decision model which
//! retrieval tool answers which kind of question.

/// The logical schema the structured query tool is scoped to.
pub const TABLES: &[(&str, &[&str])] = &[
    (
        "students",
        &[
            "student_id",
            "first_name",
            "last_name",
            "email",
            "major",
            "graduation_year",
            "resume_url",
        ],
    ),
    (
        "employers",
        &["employer_id", "company_name", "industry", "website", "contact_email"],
    ),
    (
        "job_listings",
        &[
            "job_id",
            "employer_id",
            "job_title",
            "job_description",
            "min_salary",
            "max_salary",
            "location",
            "posted_date",
            "is_active",
        ],
    ),
    (
        "placements",
        &["placement_id", "student_id", "job_id", "placement_date", "offered_salary"],
    ),
];

/// Render the routing policy.
///
/// With `required_schema = Some(s)` every table is described as living in
/// `s` and the model is told to qualify table names with `s.`.
pub fn routing_policy(required_schema: Option<&str>) -> String {
    let schema = required_schema.filter(|s| !s.is_empty());

    let mut out = String::from(
        "You are an expert assistant for a job placement agency. \
         Answer the user's questions using the tools provided.\n\n",
    );

    match schema {
        Some(s) => out.push_str(&format!(
            "Here is the database schema you can query. ALL tables are in the `{s}` schema:\n"
        )),
        None => out.push_str("Here is the database schema you can query:\n"),
    }
    for (table, columns) in TABLES {
        out.push_str(&format!("- `{table}` (columns: {})\n", columns.join(", ")));
    }

    out.push_str("\nYou have two tools:\n\n");
    out.push_str(
        "1. `query_structured`: for questions about structured data.\n   \
         Use it for counts, averages, specific names, salaries, dates, or filtering on columns \
         like `graduation_year` or `company_name`.\n",
    );
    match schema {
        Some(s) => out.push_str(&format!(
            "   IMPORTANT: you MUST prefix every table name with `{s}.`, for example \
             `SELECT count(*) FROM {s}.students;`. Unqualified table names are rejected.\n"
        )),
        None => out.push_str(
            "   Refer to tables by their bare names, for example `SELECT count(*) FROM students;`.\n",
        ),
    }
    out.push_str(
        "\n2. `search_semantic`: for questions about the content of job descriptions.\n   \
         Use it for conceptual questions like \"find jobs for a medical advisor\". It matches \
         on meaning, not exact keywords, and reports a `job_id` for every result.\n",
    );

    out.push_str(
        "\nHow to decide:\n\
         - If the question is factual and answerable with SQL, use `query_structured`.\n\
         - If it is about the role, skills or nature of a job described in free text, use \
         `search_semantic`.\n\
         - You may chain tools. For example, use `search_semantic` to find a job_id, then \
         `query_structured` to look up that job's salary.\n\
         - If a tool reports an error, correct the call or explain the problem.\n\
         - After getting results, write a clear conversational answer. Do not just repeat the \
         raw tool output.\n",
    );
    out
}
