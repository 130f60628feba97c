use crate::records::{Attendance, SearchQuery, StoredRecord, StudentRecord, SubjectScore};
use anyhow::Context;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// Opens the record store. The database lives in memory for the lifetime of
/// the process; nothing is written to disk.
pub fn open_store() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE students(
            id TEXT PRIMARY KEY,
            sort_order INTEGER NOT NULL,
            name TEXT NOT NULL,
            roll TEXT NOT NULL,
            class TEXT NOT NULL,
            section TEXT NOT NULL,
            days_present INTEGER,
            days_absent INTEGER
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_students_cohort ON students(class, section, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE marks(
            student_id TEXT NOT NULL,
            idx INTEGER NOT NULL,
            subject TEXT NOT NULL,
            obtained REAL NOT NULL,
            full REAL NOT NULL,
            PRIMARY KEY(student_id, idx),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;

    Ok(conn)
}

/// Loads records in declaration order. Returns the number inserted.
pub fn seed(conn: &mut Connection, records: &[StudentRecord]) -> anyhow::Result<usize> {
    let tx = conn.transaction()?;
    let base: i64 = tx.query_row(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM students",
        [],
        |r| r.get(0),
    )?;
    {
        let mut ins_student = tx.prepare(
            "INSERT INTO students(id, sort_order, name, roll, class, section, days_present, days_absent)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        let mut ins_mark = tx.prepare(
            "INSERT INTO marks(student_id, idx, subject, obtained, full) VALUES(?, ?, ?, ?, ?)",
        )?;
        for (i, r) in records.iter().enumerate() {
            let id = Uuid::new_v4().to_string();
            ins_student.execute(params![
                id,
                base + i as i64,
                r.name,
                r.roll,
                r.class,
                r.section,
                r.attendance.map(|a| a.present),
                r.attendance.map(|a| a.absent),
            ])?;
            for (j, m) in r.marks.iter().enumerate() {
                ins_mark.execute(params![id, j as i64, m.subject, m.obtained, m.full])?;
            }
        }
    }
    tx.commit().context("failed to commit roster")?;
    Ok(records.len())
}

/// Reads a JSON array of student records.
pub fn load_roster(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster {}", path.to_string_lossy()))?;
    let records: Vec<StudentRecord> = serde_json::from_str(&text)
        .with_context(|| format!("roster {} is not a list of records", path.to_string_lossy()))?;
    Ok(records)
}

pub fn record_count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
}

fn load_marks(conn: &Connection) -> rusqlite::Result<HashMap<String, Vec<SubjectScore>>> {
    let mut stmt = conn.prepare(
        "SELECT student_id, subject, obtained, full
         FROM marks
         ORDER BY student_id, idx",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            SubjectScore {
                subject: r.get(1)?,
                obtained: r.get(2)?,
                full: r.get(3)?,
            },
        ))
    })?;
    let mut by_student: HashMap<String, Vec<SubjectScore>> = HashMap::new();
    for row in rows {
        let (student_id, score) = row?;
        by_student.entry(student_id).or_default().push(score);
    }
    Ok(by_student)
}

fn query_records(
    conn: &Connection,
    sql: &str,
    binds: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<Vec<StoredRecord>> {
    let mut marks = load_marks(conn)?;
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(binds, |r| {
            let present: Option<u32> = r.get(6)?;
            let absent: Option<u32> = r.get(7)?;
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                present.zip(absent),
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

    Ok(rows
        .into_iter()
        .map(
            |(id, sort_order, name, roll, class, section, attendance)| StoredRecord {
                record: StudentRecord {
                    name,
                    roll,
                    class,
                    section,
                    marks: marks.remove(&id).unwrap_or_default(),
                    attendance: attendance.map(|(present, absent)| Attendance { present, absent }),
                },
                id,
                sort_order,
            },
        )
        .collect())
}

pub fn list_records(conn: &Connection) -> rusqlite::Result<Vec<StoredRecord>> {
    query_records(
        conn,
        "SELECT id, sort_order, name, roll, class, section, days_present, days_absent
         FROM students
         ORDER BY sort_order",
        &[],
    )
}

/// Members of one (class, section) cohort in declaration order.
pub fn cohort(conn: &Connection, class: &str, section: &str) -> rusqlite::Result<Vec<StudentRecord>> {
    Ok(query_records(
        conn,
        "SELECT id, sort_order, name, roll, class, section, days_present, days_absent
         FROM students
         WHERE class = ? AND section = ?
         ORDER BY sort_order",
        &[&class, &section],
    )?
    .into_iter()
    .map(|s| s.record)
    .collect())
}

/// First record, in declaration order, that satisfies every non-empty filter.
pub fn find_first(conn: &Connection, query: &SearchQuery) -> rusqlite::Result<Option<StoredRecord>> {
    // Exact filters narrow in SQL; the name filter needs Unicode lowercasing.
    let mut clauses: Vec<&str> = Vec::new();
    let mut binds: Vec<&dyn rusqlite::ToSql> = Vec::new();
    if let Some(ref roll) = query.roll {
        clauses.push("roll = ?");
        binds.push(roll);
    }
    if let Some(ref class) = query.class {
        clauses.push("class = ?");
        binds.push(class);
    }
    if let Some(ref section) = query.section {
        clauses.push("section = ?");
        binds.push(section);
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT id, sort_order, name, roll, class, section, days_present, days_absent
         FROM students
         {}
         ORDER BY sort_order",
        where_sql
    );
    let candidates = query_records(conn, &sql, &binds)?;
    Ok(candidates.into_iter().find(|c| query.matches(&c.record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::demo_records;

    fn demo_store() -> Connection {
        let mut conn = open_store().expect("open store");
        seed(&mut conn, &demo_records()).expect("seed");
        conn
    }

    #[test]
    fn seeded_records_round_trip_in_order() {
        let conn = demo_store();
        let listed = list_records(&conn).expect("list");
        let names: Vec<&str> = listed.iter().map(|s| s.record.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["John Doe", "Jane Smith", "Rahim Khan", "Sara Ali", "Anik Das"]
        );
        assert_eq!(listed[0].record, demo_records()[0]);
        assert_eq!(listed[4].record.attendance, None);
        assert_eq!(record_count(&conn).expect("count"), 5);
    }

    #[test]
    fn cohort_is_exact_class_and_section() {
        let conn = demo_store();
        let a = cohort(&conn, "10", "A").expect("cohort");
        assert_eq!(a.len(), 3);
        let b = cohort(&conn, "10", "B").expect("cohort");
        assert_eq!(b.len(), 1);
        assert!(cohort(&conn, "1", "B").expect("cohort").is_empty());
    }

    #[test]
    fn find_first_combines_filters() {
        let conn = demo_store();
        let q = SearchQuery::new(Some("khan"), None, Some("10"), None);
        let hit = find_first(&conn, &q).expect("query").expect("hit");
        assert_eq!(hit.record.roll, "07");

        let q = SearchQuery::new(Some("khan"), None, Some("10"), Some("B"));
        assert!(find_first(&conn, &q).expect("query").is_none());
    }
}
