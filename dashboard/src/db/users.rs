use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema::users;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    username: &'a str,
    password_hash: &'a str,
    is_admin: bool,
    created_at: NaiveDateTime,
}

pub fn find_by_username(conn: &mut SqliteConnection, name: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::username.eq(name))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Inserts a user. A taken username fails with a unique violation.
pub fn create(
    conn: &mut SqliteConnection,
    username: &str,
    password_hash: &str,
    is_admin: bool,
) -> QueryResult<User> {
    let new_user = NewUser {
        username,
        password_hash,
        is_admin,
        created_at: chrono::Utc::now().naive_utc(),
    };

    diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(conn)
}

pub fn list(conn: &mut SqliteConnection) -> QueryResult<Vec<User>> {
    users::table
        .order(users::id.asc())
        .select(User::as_select())
        .load(conn)
}

pub fn set_admin(conn: &mut SqliteConnection, user_id: i32, is_admin: bool) -> QueryResult<User> {
    diesel::update(users::table.find(user_id))
        .set(users::is_admin.eq(is_admin))
        .returning(User::as_returning())
        .get_result(conn)
}

/// Returns the number of deleted rows, zero for an unknown id.
pub fn delete(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<usize> {
    diesel::delete(users::table.find(user_id)).execute(conn)
}
