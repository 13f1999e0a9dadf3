use rusqlite::Connection;
use std::path::Path;
use tracing::info;

pub const DB_FILE_NAME: &str = "stuadm.sqlite3";

/// Hold catalogue rows seeded into every workspace: (hold id, default severity, staff message).
const HOLD_TYPES: &[(&str, &str, &str)] = &[
    ("01", "F", "Outstanding fine for lost or damaged testing-center resource."),
    ("02", "N", "Student must meet with the course coordinator."),
    ("06", "F", "Academic misconduct under review; testing suspended."),
    ("07", "F", "Proof of identity required before testing."),
    ("08", "N", "Student asked to update contact information."),
    ("09", "F", "Disability resources paperwork pending."),
    ("11", "N", "Placement results under review."),
    ("12", "F", "Course fee unpaid."),
    ("30", "N", "Student has an Incomplete to finish."),
    ("40", "F", "Testing privileges revoked for the term."),
];

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;
    info!(path = %db_path.display(), "workspace database ready");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS term(
            term_key TEXT PRIMARY KEY,
            start_dt TEXT NOT NULL,
            end_dt TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student(
            stu_id TEXT PRIMARY KEY,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            pref_name TEXT,
            middle_initial TEXT,
            apln_term TEXT,
            licensed TEXT,
            sev_admin_hold TEXT,
            timelimit_factor REAL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_last_name ON student(last_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stterm(
            stu_id TEXT NOT NULL,
            term_key TEXT NOT NULL,
            pace INTEGER,
            pace_track TEXT,
            PRIMARY KEY(stu_id, term_key),
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stcourse(
            stu_id TEXT NOT NULL,
            course TEXT NOT NULL,
            sect TEXT NOT NULL,
            term_key TEXT NOT NULL,
            pace_order INTEGER,
            open_status TEXT,
            completed TEXT NOT NULL DEFAULT 'N',
            i_in_progress TEXT NOT NULL DEFAULT 'N',
            i_counted TEXT,
            i_term_key TEXT,
            PRIMARY KEY(stu_id, course, term_key),
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stcourse_student ON stcourse(stu_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS csection(
            course TEXT NOT NULL,
            sect TEXT NOT NULL,
            term_key TEXT NOT NULL,
            instructor TEXT,
            PRIMARY KEY(course, sect, term_key)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cusection(
            course TEXT NOT NULL,
            sect TEXT NOT NULL,
            unit INTEGER NOT NULL,
            term_key TEXT NOT NULL,
            re_mastery_score INTEGER,
            ue_mastery_score INTEGER,
            PRIMARY KEY(course, sect, unit, term_key)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS milestone(
            term_key TEXT NOT NULL,
            pace INTEGER NOT NULL,
            pace_track TEXT NOT NULL,
            ms_nbr INTEGER NOT NULL,
            ms_type TEXT NOT NULL,
            ms_date TEXT NOT NULL,
            nbr_atmpts_allow INTEGER,
            PRIMARY KEY(term_key, pace, pace_track, ms_nbr, ms_type)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stmilestone(
            id TEXT PRIMARY KEY,
            term_key TEXT NOT NULL,
            stu_id TEXT NOT NULL,
            pace_track TEXT NOT NULL,
            ms_nbr INTEGER NOT NULL,
            ms_type TEXT NOT NULL,
            ms_date TEXT NOT NULL,
            nbr_atmpts_allow INTEGER,
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;
    ensure_stmilestone_ext_type(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stmilestone_student ON stmilestone(stu_id, term_key)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pace_appeals(
            id TEXT PRIMARY KEY,
            term_key TEXT NOT NULL,
            stu_id TEXT NOT NULL,
            appeal_dt TEXT NOT NULL,
            relief_given TEXT NOT NULL,
            pace INTEGER NOT NULL,
            pace_track TEXT NOT NULL,
            ms_nbr INTEGER NOT NULL,
            ms_type TEXT NOT NULL,
            ms_date TEXT NOT NULL,
            new_deadline_dt TEXT,
            nbr_atmpts_allow INTEGER,
            circumstances TEXT NOT NULL,
            comment TEXT,
            interviewer TEXT NOT NULL,
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;
    ensure_pace_appeals_appeal_type(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_pace_appeals_student ON pace_appeals(stu_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS hold_type(
            hold_id TEXT PRIMARY KEY,
            sev_admin_hold TEXT NOT NULL,
            staff_message TEXT NOT NULL
        )",
        [],
    )?;
    seed_hold_types(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS admin_hold(
            stu_id TEXT NOT NULL,
            hold_id TEXT NOT NULL,
            sev_admin_hold TEXT NOT NULL,
            times_display INTEGER,
            create_dt TEXT,
            PRIMARY KEY(stu_id, hold_id),
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS discipline(
            id TEXT PRIMARY KEY,
            stu_id TEXT NOT NULL,
            dt_incident TEXT NOT NULL,
            incident_type TEXT NOT NULL,
            course TEXT,
            unit INTEGER,
            cheat_desc TEXT,
            action_type TEXT,
            action_comment TEXT,
            interviewer TEXT,
            proctor TEXT,
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_discipline_student ON discipline(stu_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stexam(
            serial_nbr INTEGER PRIMARY KEY,
            stu_id TEXT NOT NULL,
            course TEXT NOT NULL,
            unit INTEGER NOT NULL,
            exam_type TEXT NOT NULL,
            version TEXT,
            exam_dt TEXT NOT NULL,
            start_time INTEGER,
            finish_time INTEGER NOT NULL,
            exam_score INTEGER,
            mastery_score INTEGER,
            passed TEXT NOT NULL,
            is_first_passed TEXT,
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stexam_student ON stexam(stu_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stqa(
            serial_nbr INTEGER NOT NULL,
            question_nbr INTEGER NOT NULL,
            objective TEXT,
            stu_answer TEXT,
            ans_correct TEXT NOT NULL,
            PRIMARY KEY(serial_nbr, question_nbr),
            FOREIGN KEY(serial_nbr) REFERENCES stexam(serial_nbr)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpe_credit(
            stu_id TEXT NOT NULL,
            course TEXT NOT NULL,
            exam_placed TEXT NOT NULL,
            exam_dt TEXT NOT NULL,
            exam_source TEXT,
            PRIMARY KEY(stu_id, course),
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpe_attempt(
            stu_id TEXT NOT NULL,
            exam_dt TEXT NOT NULL,
            proctored TEXT NOT NULL DEFAULT 'Y',
            PRIMARY KEY(stu_id, exam_dt),
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transfer_credit(
            stu_id TEXT NOT NULL,
            course TEXT NOT NULL,
            exam_dt TEXT NOT NULL,
            source TEXT,
            PRIMARY KEY(stu_id, course),
            FOREIGN KEY(stu_id) REFERENCES student(stu_id)
        )",
        [],
    )?;

    Ok(())
}

fn seed_hold_types(conn: &Connection) -> anyhow::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO hold_type(hold_id, sev_admin_hold, staff_message) VALUES(?, ?, ?)",
    )?;
    for (hold_id, severity, message) in HOLD_TYPES {
        stmt.execute((hold_id, severity, message))?;
    }
    Ok(())
}

// Workspaces created before appeal types existed have neither column.
fn ensure_stmilestone_ext_type(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "stmilestone", "ext_type")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE stmilestone ADD COLUMN ext_type TEXT", [])?;
    Ok(())
}

fn ensure_pace_appeals_appeal_type(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "pace_appeals", "appeal_type")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE pace_appeals ADD COLUMN appeal_type TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
