//! Report store — append-only, delete-only, ownership enforced on
//! every read and delete.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{NewImage, Report, ReportImage};
use crate::screening::normalize::ResultBasis;
use crate::screening::risk::RiskLevel;
use crate::screening::vitals::Gender;
use crate::screening::{ScreeningResult, VitalsInput};

const REPORT_COLUMNS: &str = "id, user_id, report_name, age, gender, weight_kg, height_cm, \
     smoker, alcohol, cholesterol, systolic_bp, fasting_blood_sugar_high, chest_pain, \
     risk, probability, basis, recommendation, text_probability, image_probability, created_at";

/// Insert a report and its image blobs as one unit.
pub fn insert_report(
    conn: &Connection,
    report: &Report,
    images: &[NewImage],
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO reports (id, user_id, report_name, age, gender, weight_kg, height_cm, \
         smoker, alcohol, cholesterol, systolic_bp, fasting_blood_sugar_high, chest_pain, \
         risk, probability, basis, recommendation, text_probability, image_probability, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            report.id.to_string(),
            report.user_id,
            report.report_name,
            report.vitals.age,
            report.vitals.gender.as_str(),
            report.vitals.weight_kg,
            report.vitals.height_cm,
            report.vitals.smoker,
            report.vitals.alcohol,
            report.vitals.cholesterol,
            report.vitals.systolic_bp,
            report.vitals.fasting_blood_sugar_high,
            report.vitals.chest_pain,
            report.result.risk.as_str(),
            report.result.probability,
            report.result.basis.as_str(),
            report.result.recommendation,
            report.result.text_probability,
            report.result.image_probability,
            report
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        ],
    )?;

    for image in images {
        tx.execute(
            "INSERT INTO report_images (id, report_id, content_type, byte_len, data) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                image.id.to_string(),
                report.id.to_string(),
                image.content_type,
                image.data.len() as i64,
                image.data,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// All reports owned by a user, newest first. Images come back as
/// metadata only.
pub fn list_reports_by_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<Report>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE user_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], row_to_report)?;

    let mut reports = Vec::new();
    for row in rows {
        let mut report = row?;
        report.images = load_image_metadata(conn, &report.id)?;
        reports.push(report);
    }
    Ok(reports)
}

/// Fetch one report; the ownership check lives in the WHERE clause so
/// a foreign id and a missing id are indistinguishable.
pub fn get_report(conn: &Connection, id: &Uuid, user_id: &str) -> Result<Report, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1 AND user_id = ?2"
    ))?;
    let mut report = stmt
        .query_row(params![id.to_string(), user_id], row_to_report)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "report".into(),
                id: id.to_string(),
            },
            other => DatabaseError::Sqlite(other),
        })?;
    report.images = load_image_metadata(conn, &report.id)?;
    Ok(report)
}

/// Fetch one image blob, checking both report linkage and ownership.
pub fn get_report_image(
    conn: &Connection,
    report_id: &Uuid,
    image_id: &Uuid,
    user_id: &str,
) -> Result<(String, Vec<u8>), DatabaseError> {
    conn.query_row(
        "SELECT i.content_type, i.data FROM report_images i \
         JOIN reports r ON r.id = i.report_id \
         WHERE i.id = ?1 AND i.report_id = ?2 AND r.user_id = ?3",
        params![image_id.to_string(), report_id.to_string(), user_id],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
            entity_type: "report image".into(),
            id: image_id.to_string(),
        },
        other => DatabaseError::Sqlite(other),
    })
}

/// Delete a report and (via cascade) its images. NotFound covers both
/// a missing id and an ownership mismatch.
pub fn delete_report(conn: &Connection, id: &Uuid, user_id: &str) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM reports WHERE id = ?1 AND user_id = ?2",
        params![id.to_string(), user_id],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "report".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn load_image_metadata(conn: &Connection, report_id: &Uuid) -> Result<Vec<ReportImage>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, content_type, byte_len FROM report_images WHERE report_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![report_id.to_string()], |row| {
        let id_str: String = row.get(0)?;
        Ok(ReportImage {
            id: parse_uuid(&id_str, 0)?,
            content_type: row.get(1)?,
            byte_len: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn row_to_report(row: &rusqlite::Row) -> Result<Report, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let gender_str: String = row.get(4)?;
    let risk_str: String = row.get(13)?;
    let basis_str: String = row.get(15)?;
    let created_str: String = row.get(19)?;

    Ok(Report {
        id: parse_uuid(&id_str, 0)?,
        user_id: row.get(1)?,
        report_name: row.get(2)?,
        vitals: VitalsInput {
            age: row.get(3)?,
            gender: Gender::parse(&gender_str)
                .ok_or_else(|| column_parse_error(4, &gender_str, "gender"))?,
            weight_kg: row.get(5)?,
            height_cm: row.get(6)?,
            smoker: row.get(7)?,
            alcohol: row.get(8)?,
            cholesterol: row.get(9)?,
            systolic_bp: row.get(10)?,
            fasting_blood_sugar_high: row.get(11)?,
            chest_pain: row.get(12)?,
        },
        result: ScreeningResult {
            risk: RiskLevel::parse(&risk_str)
                .ok_or_else(|| column_parse_error(13, &risk_str, "risk"))?,
            probability: row.get(14)?,
            basis: ResultBasis::parse(&basis_str)
                .ok_or_else(|| column_parse_error(15, &basis_str, "basis"))?,
            recommendation: row.get(16)?,
            text_probability: row.get(17)?,
            image_probability: row.get(18)?,
        },
        images: Vec::new(),
        created_at: parse_timestamp(&created_str, 19)?,
    })
}

fn parse_uuid(s: &str, idx: usize) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(s: &str, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn column_parse_error(idx: usize, value: &str, what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unrecognized {what} value: {value}").into(),
    )
}
