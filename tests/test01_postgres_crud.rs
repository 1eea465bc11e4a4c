#![cfg(feature = "test-utils")]

use pg_crud::prelude::*;
use pg_crud::test_utils::{setup_postgres_embedded, stop_postgres_embedded};
use serde_json::json;

const SCHEMA: &str = "
    CREATE TYPE order_status AS ENUM ('pending', 'shipped');
    CREATE TABLE orders (
        id SERIAL PRIMARY KEY,
        total NUMERIC(10, 2) NOT NULL,
        status order_status NOT NULL DEFAULT 'pending'
    );
    CREATE TABLE users (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        city TEXT,
        order_id INT REFERENCES orders(id),
        is_deleted BOOLEAN NOT NULL DEFAULT FALSE
    );
    CREATE TABLE audit (id SERIAL PRIMARY KEY, note TEXT);
";

#[test]
fn test01_postgres_crud() -> Result<(), Box<dyn std::error::Error>> {
    let pg = setup_postgres_embedded("crud_testing")?;
    let settings = pg.settings.clone();

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async move {
        let db = Database::connect(&settings).await?;
        {
            let conn = db.provider().get_connection().await?;
            conn.batch_execute(SCHEMA).await?;
        }

        // countDocuments on an empty table
        assert_eq!(db.table("audit").count_documents().await?, 0);

        // quotes and non-ASCII survive a round trip through bound parameters
        let tricky = "O'Brien says \"hi\" from Zoë 日本";
        let created = db
            .table("users")
            .create_one([("name", tricky), ("city", "Zürich")])
            .await?;
        let id = created["id"].clone();
        let found = db
            .table("users")
            .where_eq([("id", RowValues::from_json(&id))])
            .find_one()
            .await?
            .expect("row just inserted");
        assert_eq!(found["name"], json!(tricky));

        // Known deviation: find_in binds its values, so the same string matches.
        let rows = db.table("users").find_in(&json!({"name": [tricky]})).await?;
        assert_eq!(rows.len(), 1);

        // whereRaw fragments keep their own numbering and bind their values
        let rows = db
            .table("users")
            .where_eq([("city", "Zürich")])
            .where_raw("name = $1", vec![RowValues::from(tricky)])?
            .find()
            .await?;
        assert_eq!(rows.len(), 1);

        // populate nests the related row under its table name
        let order = db.table("orders").create_one([("total", 42.5)]).await?;
        db.table("users")
            .where_eq([("id", RowValues::from_json(&id))])
            .update_one([("order_id", RowValues::from_json(&order["id"]))])
            .await?
            .expect("user exists");
        let user = db
            .table("users")
            .select("id,name")
            .populate("orders", "id,total")
            .where_eq([("id", RowValues::from_json(&id))])
            .find_one()
            .await?
            .expect("user exists");
        assert_eq!(user["orders"], json!({"id": order["id"], "total": 42.5}));

        // numeric and enum columns bind from plain values and read back as such
        let shipped = db
            .table("orders")
            .select("status,total")
            .where_eq([("id", RowValues::from_json(&order["id"]))])
            .update_one([("status", "shipped")])
            .await?
            .expect("order exists");
        assert_eq!(shipped["status"], json!("shipped"));
        assert_eq!(shipped["total"], json!(42.5));
        let by_status = db
            .table("orders")
            .where_eq([("status", "shipped")])
            .count_documents()
            .await?;
        assert_eq!(by_status, 1);
        let err = db
            .table("orders")
            .where_eq([("id", true)])
            .find()
            .await
            .unwrap_err();
        assert!(matches!(err, PgCrudError::PostgresError(_)));

        assert_eq!(
            db.introspector().cached("users", "orders").as_deref(),
            Some("order_id")
        );

        // createMany with differing keys, then sort and paginate
        let batch = db
            .table("users")
            .create_many(&[
                ColumnValues::from([("name", "bea"), ("city", "Oslo")]),
                ColumnValues::from([("name", "cal")]),
                ColumnValues::from([("name", "dee"), ("city", "Oslo")]),
            ])
            .await?;
        assert_eq!(batch.len(), 3);
        let page = db
            .table("users")
            .select("name")
            .where_in("name", ["bea", "cal", "dee"])?
            .sort(Some("name"), "1")
            .pagination(1, 2)
            .find()
            .await?;
        assert_eq!(page, vec![json!({"name": "dee"}).as_object().cloned().unwrap_or_default()]);

        let oslo = db.table("users").filter([("city", "Os%")]).count_documents().await?;
        assert_eq!(oslo, 2);

        // updateMany reports only the ids it touched
        let bea = batch[0]["id"].clone();
        let updated = db
            .table("users")
            .update_many(vec![
                UpdateEntry::new([("id", RowValues::from_json(&bea))], [("city", "Bergen")]),
                UpdateEntry::new([("id", -1)], [("city", "Nowhere")]),
            ])
            .await?;
        assert_eq!(updated, vec![bea.clone()]);

        // soft then permanent delete
        let flagged = db
            .table("users")
            .where_eq([("id", RowValues::from_json(&bea))])
            .soft_delete()
            .await?;
        assert_eq!(flagged, Some(bea.clone()));
        let live = db
            .table("users")
            .where_eq([("is_deleted", false)])
            .count_documents()
            .await?;
        assert_eq!(live, 3);
        let removed = db
            .table("users")
            .where_eq([("is_deleted", true)])
            .permanent_delete()
            .await?;
        assert_eq!(removed, vec![bea]);

        // caller-owned transactions are honored and left to the caller
        {
            let mut conn = db.provider().get_connection().await?;
            let tx = conn.transaction().await?;
            db.table("audit")
                .using(&tx)
                .create_one([("note", "rolled back")])
                .await?;
            assert_eq!(db.table("audit").using(&tx).count_documents().await?, 1);
            tx.rollback().await?;
        }
        assert_eq!(db.table("audit").count_documents().await?, 0);

        // usage errors are raised before anything runs
        let err = db.table("users").update_one([("name", "x")]).await.unwrap_err();
        assert!(matches!(err, PgCrudError::WhereClauseRequired { .. }));
        let err = db
            .table("users")
            .populate("audit", "id")
            .find()
            .await
            .unwrap_err();
        assert!(matches!(err, PgCrudError::ForeignKeyNotFound { .. }));

        Ok::<(), PgCrudError>(())
    });

    stop_postgres_embedded(pg);
    outcome?;
    Ok(())
}
