use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::company::CompanyRow;

/// Trims and collapses inner whitespace. Empty names are rejected.
pub fn normalize_company_name(raw: &str) -> Result<String, AppError> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(AppError::Validation(
            "company_name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

pub async fn list_companies(db: &PgPool) -> Result<Vec<CompanyRow>, AppError> {
    let rows = sqlx::query_as::<_, CompanyRow>(
        "SELECT id, company_name, created_at FROM companies ORDER BY lower(company_name)",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

async fn name_taken(db: &PgPool, name: &str, except: Option<Uuid>) -> Result<bool, AppError> {
    let taken: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM companies WHERE lower(company_name) = lower($1) AND ($2::uuid IS NULL OR id <> $2) LIMIT 1",
    )
    .bind(name)
    .bind(except)
    .fetch_optional(db)
    .await?;
    Ok(taken.is_some())
}

pub async fn add_company(db: &PgPool, raw_name: &str) -> Result<CompanyRow, AppError> {
    let name = normalize_company_name(raw_name)?;
    if name_taken(db, &name, None).await? {
        return Err(AppError::Conflict(format!("Company '{name}' already exists")));
    }

    let row = sqlx::query_as::<_, CompanyRow>(
        r#"
        INSERT INTO companies (id, company_name)
        VALUES ($1, $2)
        RETURNING id, company_name, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .fetch_one(db)
    .await
    .map_err(|e| unique_violation_as_conflict(e, &name))?;

    tracing::info!("Company added: {name} ({})", row.id);
    Ok(row)
}

pub async fn rename_company(db: &PgPool, id: Uuid, raw_name: &str) -> Result<CompanyRow, AppError> {
    let name = normalize_company_name(raw_name)?;
    if name_taken(db, &name, Some(id)).await? {
        return Err(AppError::Conflict(format!("Company '{name}' already exists")));
    }

    let row = sqlx::query_as::<_, CompanyRow>(
        "UPDATE companies SET company_name = $1 WHERE id = $2 RETURNING id, company_name, created_at",
    )
    .bind(&name)
    .bind(id)
    .fetch_optional(db)
    .await
    .map_err(|e| unique_violation_as_conflict(e, &name))?;

    row.ok_or_else(|| AppError::NotFound(format!("Company {id} not found")))
}

pub async fn delete_company(db: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Company {id} not found")));
    }
    tracing::info!("Company deleted: {id}");
    Ok(())
}

/// Two concurrent inserts can both pass the `name_taken` check; the unique index
/// settles it.
fn unique_violation_as_conflict(err: sqlx::Error, name: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("Company '{name}' already exists"))
        }
        _ => AppError::Database(err),
    }
}
