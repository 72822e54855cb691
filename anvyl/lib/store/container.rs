use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{AnvylError, AnvylResult};

use super::{classify_db_error, Container, ContainerStatus, ContainerUpdate, NewContainer};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Persists a new container row with `status = created` and no engine id.
///
/// Fails with `NotFound` when the host does not exist and `Conflict` when a
/// live container with the same name already exists on that host.
pub async fn add_container(pool: &Pool<Sqlite>, new: NewContainer) -> AnvylResult<Container> {
    // The FK violation alone cannot distinguish a missing host from a missing
    // container reference, so check the host explicitly first.
    super::get_host(pool, &new.host_id).await?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO containers
            (id, name, image, host_id, status, labels, ports, volumes, environment, command,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new.name)
    .bind(&new.image)
    .bind(&new.host_id)
    .bind(ContainerStatus::Created)
    .bind(&new.labels)
    .bind(&new.ports)
    .bind(&new.volumes)
    .bind(&new.environment)
    .bind(&new.command)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| {
        classify_db_error(
            e,
            &format!("container '{}' already exists on host", new.name),
        )
    })?;

    get_container(pool, &id).await
}

/// Fetches a container by internal id or by engine id.
pub async fn get_container(pool: &Pool<Sqlite>, id: &str) -> AnvylResult<Container> {
    sqlx::query_as::<_, Container>("SELECT * FROM containers WHERE id = ? OR docker_id = ?")
        .bind(id)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AnvylError::NotFound(format!("container '{}'", id)))
}

/// Fetches a container by its engine id only.
pub async fn get_container_by_docker_id(
    pool: &Pool<Sqlite>,
    docker_id: &str,
) -> AnvylResult<Option<Container>> {
    let container = sqlx::query_as::<_, Container>("SELECT * FROM containers WHERE docker_id = ?")
        .bind(docker_id)
        .fetch_optional(pool)
        .await?;

    Ok(container)
}

/// Lists containers, newest first.
///
/// `host_id` narrows to one host; unless `include_all` is set, only rows in
/// the `created` or `running` states are returned.
pub async fn list_containers(
    pool: &Pool<Sqlite>,
    host_id: Option<&str>,
    include_all: bool,
) -> AnvylResult<Vec<Container>> {
    let containers = match (host_id, include_all) {
        (Some(host), true) => {
            sqlx::query_as::<_, Container>(
                "SELECT * FROM containers WHERE host_id = ? ORDER BY created_at DESC",
            )
            .bind(host)
            .fetch_all(pool)
            .await?
        }
        (Some(host), false) => {
            sqlx::query_as::<_, Container>(
                r#"
                SELECT * FROM containers
                WHERE host_id = ? AND status IN ('created', 'running')
                ORDER BY created_at DESC
                "#,
            )
            .bind(host)
            .fetch_all(pool)
            .await?
        }
        (None, true) => {
            sqlx::query_as::<_, Container>("SELECT * FROM containers ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?
        }
        (None, false) => {
            sqlx::query_as::<_, Container>(
                r#"
                SELECT * FROM containers
                WHERE status IN ('created', 'running')
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(containers)
}

/// Applies a partial update to a container and returns the new row.
pub async fn update_container(
    pool: &Pool<Sqlite>,
    id: &str,
    update: ContainerUpdate,
) -> AnvylResult<Container> {
    let result = sqlx::query(
        r#"
        UPDATE containers
        SET docker_id = COALESCE(?, docker_id),
            status = COALESCE(?, status),
            exit_code = COALESCE(?, exit_code),
            started_at = COALESCE(?, started_at),
            finished_at = COALESCE(?, finished_at),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.docker_id)
    .bind(update.status)
    .bind(update.exit_code)
    .bind(update.started_at)
    .bind(update.finished_at)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AnvylError::NotFound(format!("container '{}'", id)));
    }

    get_container(pool, id).await
}

/// Deletes a container row.
pub async fn remove_container(pool: &Pool<Sqlite>, id: &str) -> AnvylResult<()> {
    let result = sqlx::query("DELETE FROM containers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AnvylError::NotFound(format!("container '{}'", id)));
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
