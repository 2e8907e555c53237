//! Resource engine: backend-agnostic CRUD over a document collection.

mod crud;
pub use crud::CrudResource;
