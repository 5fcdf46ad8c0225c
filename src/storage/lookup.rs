use anyhow::Result;

use crate::models::{Id, Portfolio};

use super::Storage;

/// Look a portfolio up by id, falling back to a case-insensitive name match.
pub async fn find_portfolio(storage: &dyn Storage, id_or_name: &str) -> Result<Option<Portfolio>> {
    if Id::is_path_safe(id_or_name) {
        let id = Id::from_string(id_or_name);
        if let Some(portfolio) = storage.get_portfolio(&id).await? {
            return Ok(Some(portfolio));
        }
    }

    let portfolios = storage.list_portfolios().await?;
    let mut matches: Vec<Portfolio> = portfolios
        .into_iter()
        .filter(|p| p.name.eq_ignore_ascii_case(id_or_name.trim()))
        .collect();

    if matches.is_empty() {
        return Ok(None);
    }

    if matches.len() > 1 {
        let ids: Vec<String> = matches.iter().map(|p| p.id.to_string()).collect();
        anyhow::bail!("Multiple portfolios named '{id_or_name}'. Use an ID instead: {ids:?}");
    }

    Ok(matches.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::models::{SequenceIdGenerator, UuidIdGenerator};
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn finds_by_id_then_by_name() -> Result<()> {
        let storage = MemoryStorage::new();
        let ids = SequenceIdGenerator::new([Id::from("p-1")]);
        let portfolio = Portfolio::new_with_generator(&ids, &SystemClock, "Retirement", "");
        storage.save_portfolio(&portfolio).await?;

        let by_id = find_portfolio(&storage, "p-1").await?.expect("by id");
        assert_eq!(by_id.name, "Retirement");

        let by_name = find_portfolio(&storage, "retirement").await?.expect("by name");
        assert_eq!(by_name.id, portfolio.id);

        assert!(find_portfolio(&storage, "missing").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_names_are_ambiguous() -> Result<()> {
        let storage = MemoryStorage::new();
        for _ in 0..2 {
            let p = Portfolio::new_with_generator(&UuidIdGenerator, &SystemClock, "Trading", "");
            storage.save_portfolio(&p).await?;
        }

        let err = find_portfolio(&storage, "Trading").await.unwrap_err();
        assert!(err.to_string().contains("Multiple portfolios named"));
        Ok(())
    }
}
