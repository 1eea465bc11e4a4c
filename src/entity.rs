/// A table with a declared column set.
///
/// Builders obtained through [`Database::entity`](crate::Database::entity) reject any
/// reference to a column outside `COLUMNS` before a statement is sent.
///
/// ```rust
/// use pg_crud::Entity;
///
/// pub struct Products;
///
/// impl Entity for Products {
///     const TABLE: &'static str = "products";
///     const COLUMNS: &'static [&'static str] =
///         &["id", "name", "price", "stock", "category_id", "is_deleted"];
/// }
/// ```
pub trait Entity {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
}
