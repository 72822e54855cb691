use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{AnvylError, AnvylResult};

use super::{classify_db_error, Host, HostStatus, HostUpdate, NewHost};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Registers a new host and returns the stored row.
pub async fn add_host(pool: &Pool<Sqlite>, new_host: NewHost) -> AnvylResult<Host> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let tags = serde_json::to_string(&new_host.tags)?;

    sqlx::query(
        r#"
        INSERT INTO hosts (id, name, ip, os, status, tags, is_local, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_host.name)
    .bind(&new_host.ip)
    .bind(&new_host.os)
    .bind(HostStatus::Active)
    .bind(&tags)
    .bind(new_host.is_local)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| classify_db_error(e, &format!("host '{}' already exists", new_host.name)))?;

    get_host(pool, &id).await
}

/// Fetches a host by id.
pub async fn get_host(pool: &Pool<Sqlite>, id: &str) -> AnvylResult<Host> {
    sqlx::query_as::<_, Host>("SELECT * FROM hosts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AnvylError::NotFound(format!("host '{}'", id)))
}

/// Fetches the row with `is_local = true`.
pub async fn get_local_host(pool: &Pool<Sqlite>) -> AnvylResult<Host> {
    sqlx::query_as::<_, Host>("SELECT * FROM hosts WHERE is_local = 1")
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AnvylError::NotFound("local host not registered yet".to_string()))
}

/// Lists all hosts, oldest first.
pub async fn list_hosts(pool: &Pool<Sqlite>) -> AnvylResult<Vec<Host>> {
    let hosts = sqlx::query_as::<_, Host>("SELECT * FROM hosts ORDER BY created_at ASC")
        .fetch_all(pool)
        .await?;

    Ok(hosts)
}

/// Applies a partial update to a host and returns the new row.
pub async fn update_host(pool: &Pool<Sqlite>, id: &str, update: HostUpdate) -> AnvylResult<Host> {
    let tags = update.tags.map(|t| serde_json::to_string(&t)).transpose()?;

    let result = sqlx::query(
        r#"
        UPDATE hosts
        SET name = COALESCE(?, name),
            status = COALESCE(?, status),
            tags = COALESCE(?, tags),
            resources = COALESCE(?, resources),
            metadata = COALESCE(?, metadata),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.name)
    .bind(update.status)
    .bind(&tags)
    .bind(&update.resources)
    .bind(&update.metadata)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AnvylError::NotFound(format!("host '{}'", id)));
    }

    get_host(pool, id).await
}

/// Records a heartbeat: bumps `last_heartbeat` and flips the host to active.
pub async fn heartbeat(pool: &Pool<Sqlite>, id: &str) -> AnvylResult<Host> {
    let now = Utc::now();

    let result = sqlx::query(
        "UPDATE hosts SET last_heartbeat = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(HostStatus::Active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AnvylError::NotFound(format!("host '{}'", id)));
    }

    get_host(pool, id).await
}

/// Deletes a host and, through the cascade, its containers.
///
/// The local host is never deletable.
pub async fn remove_host(pool: &Pool<Sqlite>, id: &str) -> AnvylResult<()> {
    let host = get_host(pool, id).await?;

    if host.is_local {
        return Err(AnvylError::Invariant(
            "the local host cannot be removed".to_string(),
        ));
    }

    sqlx::query("DELETE FROM hosts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Returns the local host row, creating it on first service start.
pub async fn ensure_local_host(
    pool: &Pool<Sqlite>,
    name: &str,
    ip: &str,
    os: &str,
) -> AnvylResult<Host> {
    if let Result::Ok(host) = get_local_host(pool).await {
        return Ok(host);
    }

    add_host(
        pool,
        NewHost {
            name: name.to_string(),
            ip: ip.to_string(),
            os: Some(os.to_string()),
            tags: vec![],
            is_local: true,
        },
    )
    .await
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::init_memory_db;

    fn remote(name: &str, ip: &str) -> NewHost {
        NewHost {
            name: name.to_string(),
            ip: ip.to_string(),
            os: Some("Linux".to_string()),
            tags: vec!["lab".to_string()],
            is_local: false,
        }
    }

    #[tokio::test]
    async fn test_add_and_list_hosts_ordered() {
        let pool = init_memory_db().await.unwrap();

        let first = add_host(&pool, remote("alpha", "10.0.0.1")).await.unwrap();
        let second = add_host(&pool, remote("beta", "10.0.0.2")).await.unwrap();

        let hosts = list_hosts(&pool).await.unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].id, first.id);
        assert_eq!(hosts[1].id, second.id);
        assert_eq!(hosts[0].tags_list(), vec!["lab".to_string()]);
    }

    #[tokio::test]
    async fn test_local_host_bootstrap_is_idempotent() {
        let pool = init_memory_db().await.unwrap();

        let a = ensure_local_host(&pool, "node", "192.168.1.5", "Linux")
            .await
            .unwrap();
        let b = ensure_local_host(&pool, "other-name", "10.0.0.9", "Linux")
            .await
            .unwrap();

        assert_eq!(a.id, b.id);
        assert!(b.is_local);

        let locals: Vec<Host> = list_hosts(&pool)
            .await
            .unwrap()
            .into_iter()
            .filter(|h| h.is_local)
            .collect();
        assert_eq!(locals.len(), 1);
    }

    #[tokio::test]
    async fn test_local_host_is_undeletable() {
        let pool = init_memory_db().await.unwrap();
        let local = ensure_local_host(&pool, "node", "127.0.0.1", "Linux")
            .await
            .unwrap();

        let err = remove_host(&pool, &local.id).await.unwrap_err();
        assert!(matches!(err, AnvylError::Invariant(_)));
        assert!(get_host(&pool, &local.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_host_partial_fields() {
        let pool = init_memory_db().await.unwrap();
        let host = add_host(&pool, remote("alpha", "10.0.0.1")).await.unwrap();

        let updated = update_host(
            &pool,
            &host.id,
            HostUpdate {
                status: Some(HostStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.status, HostStatus::Inactive);
        assert_eq!(updated.name, "alpha");
        assert!(updated.updated_at >= host.updated_at);
    }

    #[tokio::test]
    async fn test_remove_missing_host_is_not_found() {
        let pool = init_memory_db().await.unwrap();
        let err = remove_host(&pool, "no-such-id").await.unwrap_err();
        assert!(matches!(err, AnvylError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_heartbeat_reactivates_host() {
        let pool = init_memory_db().await.unwrap();
        let host = add_host(&pool, remote("alpha", "10.0.0.1")).await.unwrap();
        update_host(
            &pool,
            &host.id,
            HostUpdate {
                status: Some(HostStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let beat = heartbeat(&pool, &host.id).await.unwrap();
        assert_eq!(beat.status, HostStatus::Active);
        assert!(beat.last_heartbeat.is_some());
    }
}
