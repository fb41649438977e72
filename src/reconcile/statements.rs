//! SQL for every read and write the front desk performs.
//!
//! Statements use positional `?N` parameters so that the same text runs on
//! the local SQLite store and on the remote database service.

use crate::persistence::{SqlValue, Statement};
use crate::records::{CardFields, PatientFields, PaymentFields, VitalFields};
use chrono::NaiveDate;

pub const HISTORY_LIMIT: usize = 50;
pub const SEARCH_LIMIT: usize = 100;

const PATIENT_COLUMNS: &[&str] = &[
    "pname", "pbirth", "pidnum", "pidnum2", "sex", "relation", "fcode", "crippled", "bohun",
    "agree",
];
const CARD_COLUMNS: &[&str] = &[
    "fcode",
    "fname",
    "fidnum",
    "begindate",
    "enddate",
    "caretype",
    "cardnum",
    "company",
];
const VITAL_COLUMNS: &[&str] = &[
    "weight",
    "height",
    "temperatur",
    "pulse",
    "systolic",
    "diastolic",
];
const PAYMENT_COLUMNS: &[&str] = &["pcode", "visidate", "misu", "whanbul", "whansu"];

const LAST_CHECKED: (&str, &str) = ("lastcheck", "CURRENT_TIMESTAMP");

/// What to do when an insert hits an existing conflict key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the stored row; the first writer wins.
    InsertIfAbsent,
    /// Replace every non-key column with the incoming value.
    OverwriteOnConflict,
}

/// Whether a write creates a record or replaces an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target<K> {
    New,
    Existing(K),
}

/// Statements that make up one logical write, applied all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
    pub statements: Vec<Statement>,
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn assignments(columns: &[&str], start: usize) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", column, start + i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `INSERT ... RETURNING *` binding `columns` in order, plus columns whose
/// value is an SQL expression evaluated by the store.
pub fn insert_sql(table: &str, columns: &[&str], server_assigned: &[(&str, &str)]) -> String {
    let mut names: Vec<&str> = columns.to_vec();
    names.extend(server_assigned.iter().map(|(name, _)| *name));
    let mut values = placeholders(1, columns.len());
    for (_, expression) in server_assigned {
        values.push_str(", ");
        values.push_str(expression);
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        table,
        names.join(", "),
        values
    )
}

/// `INSERT ... ON CONFLICT` keyed on `conflict_column`.
pub fn upsert_sql(
    table: &str,
    conflict_column: &str,
    columns: &[&str],
    policy: ConflictPolicy,
) -> String {
    let updates: Vec<String> = columns
        .iter()
        .filter(|column| **column != conflict_column)
        .map(|column| format!("{} = excluded.{}", column, column))
        .collect();
    let action = match policy {
        ConflictPolicy::OverwriteOnConflict if !updates.is_empty() => {
            format!("DO UPDATE SET {}", updates.join(", "))
        }
        _ => "DO NOTHING".to_string(),
    };
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {} RETURNING *",
        table,
        columns.join(", "),
        placeholders(1, columns.len()),
        conflict_column,
        action
    )
}

/// `UPDATE ... RETURNING *` that writes every listed column. The key is bound
/// after the columns.
pub fn full_replace_sql(
    table: &str,
    key_column: &str,
    columns: &[&str],
    server_assigned: &[(&str, &str)],
) -> String {
    let mut set = assignments(columns, 1);
    for (name, expression) in server_assigned {
        set.push_str(&format!(", {} = {}", name, expression));
    }
    format!(
        "UPDATE {} SET {} WHERE {} = ?{} RETURNING *",
        table,
        set,
        key_column,
        columns.len() + 1
    )
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Patients
// =============================================================================

fn patient_values(fields: &PatientFields) -> Vec<SqlValue> {
    vec![
        fields.name.clone().into(),
        fields.birth_date.into(),
        fields.id_prefix.clone().into(),
        fields.id_suffix.clone().into(),
        fields.sex.as_code().into(),
        fields.relation.clone().into(),
        fields.family_code.clone().into(),
        fields.disabled.into(),
        fields.benefit_restricted.into(),
        fields.consent.into(),
    ]
}

/// New patients get a store-assigned `pcode`. Existing patients are fully
/// replaced: optional fields missing from `fields` are cleared.
pub fn patient_write(fields: &PatientFields, target: &Target<i64>) -> Statement {
    let mut params = patient_values(fields);
    match target {
        Target::New => Statement::new(
            insert_sql("person", PATIENT_COLUMNS, &[LAST_CHECKED]),
            params,
        ),
        Target::Existing(pcode) => {
            params.push((*pcode).into());
            Statement::new(
                full_replace_sql("person", "pcode", PATIENT_COLUMNS, &[LAST_CHECKED]),
                params,
            )
        }
    }
}

pub fn patient_by_id(pcode: i64) -> Statement {
    Statement::new("SELECT * FROM person WHERE pcode = ?1", vec![pcode.into()])
}

pub fn patient_delete(pcode: i64) -> Statement {
    Statement::new(
        "DELETE FROM person WHERE pcode = ?1 RETURNING *",
        vec![pcode.into()],
    )
}

/// Name contains `keyword`, or the identifier prefix starts with it.
pub fn patient_search(keyword: &str) -> Statement {
    let escaped = like_escape(keyword.trim());
    Statement::new(
        format!(
            "SELECT * FROM person WHERE pname LIKE ?1 ESCAPE '\\' OR pidnum LIKE ?2 ESCAPE '\\' \
             ORDER BY pname, pcode LIMIT {}",
            SEARCH_LIMIT
        ),
        vec![format!("%{}%", escaped).into(), format!("{}%", escaped).into()],
    )
}

pub fn patient_search_by_name(name: &str) -> Statement {
    Statement::new(
        format!(
            "SELECT * FROM person WHERE pname LIKE ?1 ESCAPE '\\' ORDER BY pname, pcode LIMIT {}",
            SEARCH_LIMIT
        ),
        vec![format!("%{}%", like_escape(name.trim())).into()],
    )
}

// =============================================================================
// Family cards
// =============================================================================

fn card_values(fields: &CardFields) -> Vec<SqlValue> {
    vec![
        fields.family_code.clone().into(),
        fields.head_name.clone().into(),
        fields.head_id.clone().into(),
        fields.begin_date.into(),
        fields.end_date.into(),
        fields.coverage.map(|c| c.as_code()).into(),
        fields.card_number.clone().into(),
        fields.company.clone().into(),
    ]
}

/// Registers the family if it is new, then overwrites its card slot. Both
/// statements run in one transaction.
pub fn card_write(fields: &CardFields) -> WritePlan {
    WritePlan {
        statements: vec![
            Statement::new(
                upsert_sql("family", "fcode", &["fcode"], ConflictPolicy::InsertIfAbsent),
                vec![fields.family_code.clone().into()],
            ),
            Statement::new(
                upsert_sql(
                    "card",
                    "fcode",
                    CARD_COLUMNS,
                    ConflictPolicy::OverwriteOnConflict,
                ),
                card_values(fields),
            ),
        ],
    }
}

/// Overwrites the card of a family that already has one.
pub fn card_update(fields: &CardFields) -> Statement {
    let mut params = card_values(fields);
    let family_code = params.remove(0);
    params.push(family_code);
    Statement::new(
        full_replace_sql("card", "fcode", &CARD_COLUMNS[1..], &[]),
        params,
    )
}

pub fn card_by_family(family_code: &str) -> Statement {
    Statement::new(
        "SELECT * FROM card WHERE fcode = ?1",
        vec![family_code.into()],
    )
}

// =============================================================================
// Vitals
// =============================================================================

fn vital_values(fields: &VitalFields) -> Vec<SqlValue> {
    vec![
        fields.weight.into(),
        fields.height.into(),
        fields.temperature.into(),
        fields.pulse.into(),
        fields.systolic.into(),
        fields.diastolic.into(),
    ]
}

/// Appends an observation; inserts nothing when the patient does not exist.
pub fn vital_append(patient_id: i64, fields: &VitalFields) -> Statement {
    let mut params = vec![SqlValue::from(patient_id)];
    params.extend(vital_values(fields));
    Statement::new(
        format!(
            "INSERT INTO checkperson (pcode, {}) SELECT {} \
             WHERE EXISTS (SELECT 1 FROM person WHERE pcode = ?1) RETURNING *",
            VITAL_COLUMNS.join(", "),
            placeholders(1, VITAL_COLUMNS.len() + 1)
        ),
        params,
    )
}

/// Replaces the measurements of the patient's most recent observation.
pub fn vital_update_latest(patient_id: i64, fields: &VitalFields) -> Statement {
    let mut params = vital_values(fields);
    params.push(patient_id.into());
    Statement::new(
        format!(
            "UPDATE checkperson SET {} WHERE id = (SELECT id FROM checkperson WHERE pcode = ?{} \
             ORDER BY measured_at DESC, id DESC LIMIT 1) RETURNING *",
            assignments(VITAL_COLUMNS, 1),
            VITAL_COLUMNS.len() + 1
        ),
        params,
    )
}

pub fn latest_vital(patient_id: i64) -> Statement {
    Statement::new(
        "SELECT * FROM checkperson WHERE pcode = ?1 ORDER BY measured_at DESC, id DESC LIMIT 1",
        vec![patient_id.into()],
    )
}

// =============================================================================
// Payments
// =============================================================================

/// Appends a payment dated `today` unless the caller gave a visit date.
/// Absent amounts are recorded as zero.
pub fn payment_append(fields: &PaymentFields, today: NaiveDate) -> Statement {
    Statement::new(
        format!(
            "INSERT INTO feelog ({}) SELECT {} \
             WHERE EXISTS (SELECT 1 FROM person WHERE pcode = ?1) RETURNING *",
            PAYMENT_COLUMNS.join(", "),
            placeholders(1, PAYMENT_COLUMNS.len())
        ),
        vec![
            fields.patient_id.into(),
            fields.visit_date.unwrap_or(today).into(),
            fields.outstanding.unwrap_or(0).into(),
            fields.settled_full.unwrap_or(0).into(),
            fields.settled_partial.unwrap_or(0).into(),
        ],
    )
}

pub fn payment_history(patient_id: i64) -> Statement {
    Statement::new(
        format!(
            "SELECT * FROM feelog WHERE pcode = ?1 ORDER BY visidate DESC, id DESC LIMIT {}",
            HISTORY_LIMIT
        ),
        vec![patient_id.into()],
    )
}
