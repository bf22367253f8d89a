use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::PgPool;
use std::time::Duration;

use crate::model::employee::Employee;

/// PIN => employee. Every staff action starts with a PIN lookup.
pub static PIN_CACHE: Lazy<Cache<String, Employee>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000) // every possible 4-digit PIN
        .time_to_live(Duration::from_secs(3600))
        .build()
});

/// Find the employee owning `pin`, cache first.
pub async fn lookup(pool: &PgPool, pin: &str) -> Result<Option<Employee>, sqlx::Error> {
    if let Some(emp) = PIN_CACHE.get(pin).await {
        return Ok(Some(emp));
    }

    let emp = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE pin = $1")
        .bind(pin)
        .fetch_optional(pool)
        .await?;

    if let Some(emp) = &emp {
        PIN_CACHE.insert(emp.pin.clone(), emp.clone()).await;
    }

    Ok(emp)
}

/// Drop everything; called after any employee is created, edited or deleted.
pub fn invalidate() {
    PIN_CACHE.invalidate_all();
}

/// Load all employees into the cache (batched)
pub async fn warmup_pin_cache(pool: &PgPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, Employee>("SELECT * FROM employees").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(row?);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_insert(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_insert(&batch).await;
    }

    log::info!("PIN cache warmup complete: {} employees", total_count);

    Ok(())
}

async fn batch_insert(employees: &[Employee]) {
    let futures: Vec<_> = employees
        .iter()
        .map(|e| PIN_CACHE.insert(e.pin.clone(), e.clone()))
        .collect();

    futures::future::join_all(futures).await;
}
