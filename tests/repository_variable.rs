use sqlx::PgPool;
use std::sync::Arc;
use blog_backend::domain::entities::UpsertVariable;
use blog_backend::domain::repositories::VariableRepository;
use blog_backend::infrastructure::persistence::PgVariableRepository;

fn variable(key: &str, value: &str) -> UpsertVariable {
    UpsertVariable {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_upsert_inserts_then_replaces(pool: PgPool) {
    let repo = PgVariableRepository::new(Arc::new(pool));

    assert_eq!(repo.upsert(variable("footer", "a")).await.unwrap(), 1);
    assert_eq!(repo.upsert(variable("footer", "b")).await.unwrap(), 1);

    let all = repo.list().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].key, "footer");
    assert_eq!(all[0].value, "b");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete(pool: PgPool) {
    let repo = PgVariableRepository::new(Arc::new(pool));
    repo.upsert(variable("header", "x")).await.unwrap();
    let id = repo.list().await.unwrap()[0].id;

    assert!(repo.delete(id).await.unwrap());
    assert!(!repo.delete(id).await.unwrap());
    assert!(repo.list().await.unwrap().is_empty());
}
