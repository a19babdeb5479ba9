/*!
 * Database module for persistent storage of documents and item flags.
 *
 * This module provides SQLite-based persistence for:
 * - Documents and their ordered items
 * - Per-item metadata, namespaced, where batch flags live
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::Repository;
