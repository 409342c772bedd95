use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use object_store::ObjectStore;
use object_store::memory::InMemory;
use redload_core::warehouse::InMemoryWarehouse;
use redload_core::{
    ColumnTypes, ConfigError, CopyCredentials, CredentialError, CsvWriterOptions, Dataset,
    InsertOptions,
    LoadError, LoadOptions, ObjectStager, RedloadError, Result, SchemaError, StaticCredentials,
    StorageConfig, TableRef, WarehouseError, copy, insert,
};

fn orders() -> Dataset {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("customer", DataType::Utf8, true),
        Field::new("total", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
            Arc::new(StringArray::from(vec![Some("acme"), None])) as ArrayRef,
            Arc::new(Float64Array::from(vec![Some(9.5), Some(12.0)])) as ArrayRef,
        ],
    )
    .unwrap();
    Dataset::from_batch(batch)
}

fn target() -> TableRef {
    TableRef::new("public", "orders").unwrap()
}

fn stager(store: Arc<InMemory>) -> ObjectStager {
    ObjectStager::new(
        store,
        StorageConfig::new("loads")
            .unwrap()
            .with_root("staging")
            .unwrap(),
    )
}

fn credentials() -> StaticCredentials {
    StaticCredentials::new(CopyCredentials::access_key("AKIAEXAMPLE", "s3cr3t"))
}

async fn object_count(store: &InMemory) -> usize {
    store
        .list_with_delimiter(Some(&"staging".into()))
        .await
        .unwrap()
        .objects
        .len()
}

/// Existing table, no truncate, no create: one COPY, then cleanup.
#[tokio::test]
async fn test_insert_into_existing_table() -> Result<()> {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new().with_table("public", "orders");

    let summary = insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(store.clone()),
        &credentials(),
        &InsertOptions::new(),
    )
    .await?;

    let statements = warehouse.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("COPY public.orders\nFROM 's3://loads/staging/orders-"));
    assert!(statements[0].contains("IGNOREHEADER 1\nFORMAT AS CSV\nDELIMITER ','"));
    assert!(statements[0].ends_with("SECRET_ACCESS_KEY 's3cr3t'"));

    assert_eq!(summary.rows, 2);
    assert!(!summary.created);
    assert!(!summary.truncated);
    assert!(store.head(summary.staged.location()).await.is_err());
    Ok(())
}

/// Missing table with `ensure_exists`: inferred types, then COPY.
#[tokio::test]
async fn test_insert_creates_missing_table() -> Result<()> {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new();
    let target = TableRef::new("sales", "orders")?;

    let summary = insert(
        &orders(),
        &target,
        &warehouse,
        &stager(store.clone()),
        &credentials(),
        &InsertOptions::new().with_ensure_exists(true),
    )
    .await?;

    let statements = warehouse.statements();
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[0], "CREATE SCHEMA IF NOT EXISTS sales");
    assert_eq!(
        statements[1],
        "CREATE TABLE sales.orders (\n    id BIGINT,\n    customer VARCHAR(MAX),\n    total DOUBLE PRECISION\n)"
    );
    assert!(statements[2].starts_with("COPY sales.orders\n"));
    assert!(summary.created);
    assert_eq!(warehouse.tables(), vec!["sales.orders".to_string()]);
    Ok(())
}

/// Explicit column types replace inference entirely.
#[tokio::test]
async fn test_insert_uses_explicit_column_types() -> Result<()> {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new();
    let types = ColumnTypes::new()
        .with("id", "INTEGER")
        .with("customer", "VARCHAR(64)")
        .with("total", "DECIMAL(10,2)");

    insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(store),
        &credentials(),
        &InsertOptions::new()
            .with_ensure_exists(true)
            .with_column_types(types),
    )
    .await?;

    assert_eq!(
        warehouse.statements()[1],
        "CREATE TABLE public.orders (\n    id INTEGER,\n    customer VARCHAR(64),\n    total DECIMAL(10,2)\n)"
    );
    Ok(())
}

/// `ensure_exists` leaves an existing table alone.
#[tokio::test]
async fn test_ensure_exists_skips_existing_table() -> Result<()> {
    let warehouse = InMemoryWarehouse::new().with_table("public", "orders");

    let summary = insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(Arc::new(InMemory::new())),
        &credentials(),
        &InsertOptions::new().with_ensure_exists(true),
    )
    .await?;

    assert!(!summary.created);
    assert_eq!(warehouse.statements().len(), 1);
    Ok(())
}

/// Truncate and create together: truncate runs first and fails on a missing
/// table, before anything is created or staged.
#[tokio::test]
async fn test_truncate_missing_table_fails_first() {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new();

    let err = insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(store.clone()),
        &credentials(),
        &InsertOptions::new()
            .with_truncate(true)
            .with_ensure_exists(true),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        RedloadError::Warehouse(WarehouseError::UndefinedTable { .. })
    ));
    assert!(err.recovery_suggestion().is_some());
    assert_eq!(warehouse.statements(), vec!["TRUNCATE TABLE public.orders"]);
    assert!(warehouse.tables().is_empty());
    assert_eq!(object_count(&store).await, 0);
}

/// Truncate then COPY on an existing table.
#[tokio::test]
async fn test_truncate_then_copy() -> Result<()> {
    let warehouse = InMemoryWarehouse::new().with_table("public", "orders");

    let summary = insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(Arc::new(InMemory::new())),
        &credentials(),
        &InsertOptions::new().with_truncate(true),
    )
    .await?;

    let statements = warehouse.statements();
    assert_eq!(statements[0], "TRUNCATE TABLE public.orders");
    assert!(statements[1].starts_with("COPY public.orders"));
    assert!(summary.truncated);
    Ok(())
}

/// A rejected COPY keeps the staged object and reports where it is.
#[tokio::test]
async fn test_failed_copy_keeps_staged_object() {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new()
        .with_table("public", "orders")
        .with_copy_failure("Load into table 'orders' failed.");

    let err = insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(store.clone()),
        &credentials(),
        &InsertOptions::new(),
    )
    .await
    .unwrap_err();

    let orphan = err.orphaned_object().cloned().unwrap();
    assert!(orphan.key().starts_with("staging/orders-"));
    assert!(store.head(orphan.location()).await.is_ok());
    assert!(err.user_message().contains(&orphan.source_uri()));
    assert!(matches!(
        err,
        RedloadError::Load(LoadError::Copy {
            source: WarehouseError::Statement { .. },
            ..
        })
    ));
}

/// With `cleanup_on_failure` the object is deleted and the COPY error is still returned.
#[tokio::test]
async fn test_failed_copy_with_cleanup() {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new()
        .with_table("public", "orders")
        .with_copy_failure("Load into table 'orders' failed.");

    let err = insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(store.clone()),
        &credentials(),
        &InsertOptions::new().with_cleanup_on_failure(true),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        RedloadError::Load(LoadError::Copy { orphaned: None, .. })
    ));
    assert_eq!(object_count(&store).await, 0);
}

/// COPY into a table that does not exist fails as a load error.
#[tokio::test]
async fn test_copy_into_missing_table() {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new();

    let err = copy(
        &orders(),
        &target(),
        &warehouse,
        &stager(store),
        &credentials(),
        &LoadOptions::default(),
        false,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        RedloadError::Load(LoadError::Copy {
            source: WarehouseError::UndefinedTable { .. },
            orphaned: Some(_),
            ..
        })
    ));
}

/// Missing credentials stop the load before anything is staged.
#[tokio::test]
async fn test_missing_credentials_stage_nothing() {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new().with_table("public", "orders");
    let provider = StaticCredentials::new(CopyCredentials::access_key("", "s3cr3t"));

    let err = insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(store.clone()),
        &provider,
        &InsertOptions::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        RedloadError::Config(ConfigError::Credentials(CredentialError::Missing { .. }))
    ));
    assert!(warehouse.statements().is_empty());
    assert_eq!(object_count(&store).await, 0);
}

/// Creating from an empty schema fails without touching the warehouse.
#[tokio::test]
async fn test_create_from_columnless_dataset() {
    let dataset = Dataset::try_new(Arc::new(Schema::empty()), vec![]).unwrap();
    let warehouse = InMemoryWarehouse::new();

    let err = insert(
        &dataset,
        &target(),
        &warehouse,
        &stager(Arc::new(InMemory::new())),
        &credentials(),
        &InsertOptions::new().with_ensure_exists(true),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RedloadError::Schema(SchemaError::NoColumns { .. })));
    assert!(warehouse.statements().is_empty());
}

/// Custom load options replace the defaults verbatim.
#[tokio::test]
async fn test_custom_load_options() -> Result<()> {
    let warehouse = InMemoryWarehouse::new().with_table("public", "orders");
    let options = InsertOptions::new()
        .with_load_options(LoadOptions::new(["FORMAT AS CSV", "IGNOREHEADER 1", "MAXERROR 10"]));

    insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(Arc::new(InMemory::new())),
        &StaticCredentials::new(CopyCredentials::iam_role("arn:aws:iam::123:role/Loader")),
        &options,
    )
    .await?;

    let statement = &warehouse.statements()[0];
    let lines: Vec<&str> = statement.lines().skip(2).collect();
    assert_eq!(
        lines,
        vec![
            "FORMAT AS CSV",
            "IGNOREHEADER 1",
            "MAXERROR 10",
            "IAM_ROLE 'arn:aws:iam::123:role/Loader'"
        ]
    );
    Ok(())
}

/// Repeated column names are refused before any statement is issued.
#[tokio::test]
async fn test_create_with_repeated_column_names() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Int64, false),
        Field::new("a", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1])) as ArrayRef,
            Arc::new(StringArray::from(vec!["x"])) as ArrayRef,
        ],
    )
    .unwrap();
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new();

    let err = insert(
        &Dataset::from_batch(batch),
        &target(),
        &warehouse,
        &stager(store.clone()),
        &credentials(),
        &InsertOptions::new().with_ensure_exists(true),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        RedloadError::Config(ConfigError::InvalidIdentifier { kind: "column", ref value, .. }) if value == "a"
    ));
    assert!(!warehouse.statements().iter().any(|s| s.starts_with("CREATE")));
    assert_eq!(object_count(&store).await, 0);
}

/// A pipe-delimited payload is loaded with matching COPY clauses.
#[tokio::test]
async fn test_pipe_delimited_dialect() {
    let store = Arc::new(InMemory::new());
    let warehouse = InMemoryWarehouse::new()
        .with_table("public", "orders")
        .with_copy_failure("stop after COPY");
    let dialect = CsvWriterOptions::new().with_delimiter(b'|');
    let options = InsertOptions::new().with_load_options(LoadOptions::for_csv(&dialect).unwrap());

    let err = insert(
        &orders(),
        &target(),
        &warehouse,
        &stager(store.clone()).with_csv_options(dialect),
        &credentials(),
        &options,
    )
    .await
    .unwrap_err();

    let statement = &warehouse.statements()[0];
    assert!(statement.contains("FORMAT AS CSV\nDELIMITER '|'\nEMPTYASNULL"));

    let orphan = err.orphaned_object().cloned().unwrap();
    let payload = store
        .get(orphan.location())
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(
        String::from_utf8(payload.to_vec()).unwrap(),
        "id|customer|total\n1|acme|9.5\n2||12.0\n"
    );
}
