//! Database handle for the visitgate server.

pub use visitgate_core::db::DatabaseError;

visitgate_core::define_database!(AccessDatabase, "Access database migrations complete");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_works() {
        let db = AccessDatabase::open_in_memory().await;
        assert!(db.is_ok());
    }
}
