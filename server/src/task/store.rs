use crate::entities::*;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::*;

/// The fields of a task to be written by [`TaskStore::save`].
///
/// An unset `id` requests an insert; a set `id` requests an update of the
/// matching row.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

/// Data access layer for the `tasks` table.
///
/// Generic over the connection so callers can run operations either on the
/// shared [`DatabaseConnection`] or inside a transaction.
pub struct TaskStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TaskStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Inserts or updates a task row.
    ///
    /// Both timestamps are set here, unconditionally, on every write path:
    /// an insert sets `created_at` and `updated_at` to the same instant, an
    /// update refreshes only `updated_at`.
    pub async fn save(&self, record: TaskRecord) -> Result<task::Model, DbErr> {
        let now = Utc::now().fixed_offset();
        match record.id {
            None => {
                let active_model = task::ActiveModel {
                    title: ActiveValue::Set(record.title),
                    description: ActiveValue::Set(record.description),
                    completed: ActiveValue::Set(record.completed),
                    created_at: ActiveValue::Set(now),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                };
                active_model.insert(self.conn).await
            }
            Some(id) => {
                let active_model = task::ActiveModel {
                    id: ActiveValue::Unchanged(id),
                    title: ActiveValue::Set(record.title),
                    description: ActiveValue::Set(record.description),
                    completed: ActiveValue::Set(record.completed),
                    created_at: ActiveValue::NotSet,
                    updated_at: ActiveValue::Set(now),
                };
                active_model.update(self.conn).await
            }
        }
    }

    /// Returns the task with the given ID, or `None` if absent.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<task::Model>, DbErr> {
        task::Entity::find_by_id(id).one(self.conn).await
    }

    /// Returns all tasks, newest first.
    pub async fn find_all(&self) -> Result<Vec<task::Model>, DbErr> {
        task::Entity::find()
            .order_by_desc(task::Column::CreatedAt)
            .all(self.conn)
            .await
    }

    /// Returns the tasks with the given completion flag, newest first.
    pub async fn find_by_completed(&self, completed: bool) -> Result<Vec<task::Model>, DbErr> {
        task::Entity::find()
            .filter(task::Column::Completed.eq(completed))
            .order_by_desc(task::Column::CreatedAt)
            .all(self.conn)
            .await
    }

    /// Returns the tasks whose title contains the given fragment, matched
    /// case-insensitively, newest first.
    ///
    /// The fragment is matched literally; LIKE metacharacters in it carry no
    /// wildcard meaning.
    pub async fn find_by_title_contains(&self, fragment: &str) -> Result<Vec<task::Model>, DbErr> {
        let pattern = format!("%{}%", escape_like_pattern(fragment));
        task::Entity::find()
            .filter(Expr::col(task::Column::Title).ilike(pattern))
            .order_by_desc(task::Column::CreatedAt)
            .all(self.conn)
            .await
    }

    /// Removes the task with the given ID.
    pub async fn delete(&self, id: i64) -> Result<(), DbErr> {
        task::Entity::delete_by_id(id).exec(self.conn).await?;
        Ok(())
    }
}

/// Escapes the LIKE metacharacters (`\`, `%`, `_`) so a pattern built from
/// user input matches them as literal text.
fn escape_like_pattern(fragment: &str) -> String {
    fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
