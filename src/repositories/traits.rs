//! CRUD traits shared by every repository
//!
//! All methods return raw `sqlx::Error`; services turn them into `AppError`.

/// Insert a row built from `Input` and return the stored entity
pub trait Create<Entity, Input> {
    async fn create(&self, data: &Input) -> Result<Entity, sqlx::Error>;
}

/// Fetch by primary key, `None` when no row matches
pub trait Read<Entity, Id> {
    async fn read(&self, id: &Id) -> Result<Option<Entity>, sqlx::Error>;
}

/// Partial update. Fields left as `None` in `Patch` keep their stored value;
/// a missing row yields `RowNotFound`.
pub trait Update<Entity, Patch, Id> {
    async fn update(&self, id: &Id, data: &Patch) -> Result<Entity, sqlx::Error>;
}

/// Delete by primary key. Deleting a missing row is not an error.
pub trait Delete<Id> {
    async fn delete(&self, id: &Id) -> Result<(), sqlx::Error>;
}
