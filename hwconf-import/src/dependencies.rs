//! Dependency import: optional package links and session key-value pairs
//!
//! Every write here is independent of the others, so all of them are issued
//! concurrently. A failing write fails the aggregate; the rest still land.

use crate::error::ImportResult;
use crate::fanout::run_all;
use crate::plan::ImportPlan;
use hwconf_common::db::models::KeyValuePair;
use hwconf_common::SessionWriter;
use tracing::{debug, info};

/// Link every optional package of the plan to its session
pub async fn import_session_packages<S>(store: &S, plan: &ImportPlan, limit: usize) -> ImportResult<()>
where
    S: SessionWriter + ?Sized,
{
    if plan.optional_ids.is_empty() {
        return Ok(());
    }
    info!(
        session_id = plan.session_id,
        count = plan.optional_ids.len(),
        "Linking optional packages"
    );

    let writes = plan.optional_ids.iter().map(|&package_id| async move {
        store
            .insert_session_package(plan.session_id, package_id, false)
            .await?;
        debug!(session_id = plan.session_id, package_id, "Optional package linked");
        Ok(())
    });
    run_all(writes, limit).await?;
    Ok(())
}

/// Write (or overwrite) the session's key-value pairs
pub async fn import_session_key_values<S>(
    store: &S,
    session_id: i64,
    pairs: &[KeyValuePair],
    limit: usize,
) -> ImportResult<()>
where
    S: SessionWriter + ?Sized,
{
    info!(session_id, count = pairs.len(), "Loading key value pairs");

    let writes = pairs.iter().map(|pair| async move {
        store
            .upsert_session_key_value(session_id, &pair.key, &pair.value)
            .await?;
        Ok(())
    });
    run_all(writes, limit).await?;
    Ok(())
}

/// Both dependency writes at once
pub async fn import_dependencies<S>(
    store: &S,
    plan: &ImportPlan,
    pairs: &[KeyValuePair],
    limit: usize,
) -> ImportResult<()>
where
    S: SessionWriter + ?Sized,
{
    let (packages, key_values) = futures::join!(
        import_session_packages(store, plan, limit),
        import_session_key_values(store, plan.session_id, pairs, limit),
    );
    packages.and(key_values)
}
