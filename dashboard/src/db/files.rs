use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema::csv_files;

// registry entry of an uploaded file; the bytes live at `storage_path`
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = csv_files)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoredFile {
    pub id: i32,
    pub filename: String,
    pub storage_path: String,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = csv_files)]
struct NewStoredFile<'a> {
    filename: &'a str,
    storage_path: &'a str,
    uploaded_at: NaiveDateTime,
}

/// All files, most recently uploaded first.
pub fn list(conn: &mut SqliteConnection) -> QueryResult<Vec<StoredFile>> {
    csv_files::table
        .order((csv_files::uploaded_at.desc(), csv_files::id.desc()))
        .select(StoredFile::as_select())
        .load(conn)
}

pub fn find(conn: &mut SqliteConnection, file_id: i32) -> QueryResult<Option<StoredFile>> {
    csv_files::table
        .find(file_id)
        .select(StoredFile::as_select())
        .first(conn)
        .optional()
}

pub fn find_by_filename(
    conn: &mut SqliteConnection,
    name: &str,
) -> QueryResult<Option<StoredFile>> {
    csv_files::table
        .filter(csv_files::filename.eq(name))
        .select(StoredFile::as_select())
        .first(conn)
        .optional()
}

/// Registers a new file. A taken filename fails with a unique violation.
pub fn create(
    conn: &mut SqliteConnection,
    filename: &str,
    storage_path: &str,
) -> QueryResult<StoredFile> {
    let new_file = NewStoredFile {
        filename,
        storage_path,
        uploaded_at: chrono::Utc::now().naive_utc(),
    };

    diesel::insert_into(csv_files::table)
        .values(&new_file)
        .returning(StoredFile::as_returning())
        .get_result(conn)
}

/// Points an existing record at new bytes and bumps its upload time.
///
/// Returns the previous storage path along with the updated record, read
/// and written in one transaction so concurrent replaces each see the path
/// they superseded.
pub fn replace_storage(
    conn: &mut SqliteConnection,
    file_id: i32,
    storage_path: &str,
) -> QueryResult<(String, StoredFile)> {
    conn.immediate_transaction(|conn| {
        let previous: String = csv_files::table
            .find(file_id)
            .select(csv_files::storage_path)
            .first(conn)?;

        let updated = diesel::update(csv_files::table.find(file_id))
            .set((
                csv_files::storage_path.eq(storage_path),
                csv_files::uploaded_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .returning(StoredFile::as_returning())
            .get_result(conn)?;

        Ok((previous, updated))
    })
}

/// Removes the record and returns it, `None` for an unknown id.
pub fn delete(conn: &mut SqliteConnection, file_id: i32) -> QueryResult<Option<StoredFile>> {
    diesel::delete(csv_files::table.find(file_id))
        .returning(StoredFile::as_returning())
        .get_result(conn)
        .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{is_unique_violation, test_support};

    #[test]
    fn newest_first() {
        let (_dir, pool) = test_support::pool();
        let mut conn = pool.get().unwrap();

        let first = create(&mut conn, "a.csv", "/tmp/1_a.csv").unwrap();
        let second = create(&mut conn, "b.csv", "/tmp/2_b.csv").unwrap();

        let ids: Vec<_> = list(&mut conn).unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn filenames_are_unique() {
        let (_dir, pool) = test_support::pool();
        let mut conn = pool.get().unwrap();

        create(&mut conn, "same.csv", "/tmp/1_same.csv").unwrap();
        let err = create(&mut conn, "same.csv", "/tmp/2_same.csv").unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn replace_keeps_id() {
        let (_dir, pool) = test_support::pool();
        let mut conn = pool.get().unwrap();

        let original = create(&mut conn, "r.csv", "/tmp/1_r.csv").unwrap();
        let (previous, replaced) = replace_storage(&mut conn, original.id, "/tmp/2_r.csv").unwrap();
        assert_eq!(previous, "/tmp/1_r.csv");
        assert_eq!(replaced.id, original.id);
        assert_eq!(replaced.storage_path, "/tmp/2_r.csv");
        assert!(replaced.uploaded_at >= original.uploaded_at);
        assert_eq!(find_by_filename(&mut conn, "r.csv").unwrap(), Some(replaced));
    }

    #[test]
    fn delete_returns_removed_record() {
        let (_dir, pool) = test_support::pool();
        let mut conn = pool.get().unwrap();

        let file = create(&mut conn, "d.csv", "/tmp/1_d.csv").unwrap();
        assert_eq!(delete(&mut conn, file.id).unwrap(), Some(file.clone()));
        assert_eq!(delete(&mut conn, file.id).unwrap(), None);
        assert_eq!(find(&mut conn, file.id).unwrap(), None);
    }
}
