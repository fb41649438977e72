//! Front-desk database schema.
//!
//! Version history:
//! - 1: person, family, card, checkperson, feelog

use super::versioned_schema::{Column, SqlType, Table, VersionedSchema};
use crate::sqlite_column;

const PERSON_TABLE_V1: Table = Table {
    name: "person",
    columns: &[
        sqlite_column!(
            "pcode",
            SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("pname", SqlType::Text, non_null = true),
        sqlite_column!("pbirth", SqlType::Text),
        sqlite_column!("pidnum", SqlType::Text),
        sqlite_column!("pidnum2", SqlType::Text),
        sqlite_column!("sex", SqlType::Text),
        sqlite_column!("relation", SqlType::Text),
        sqlite_column!("crippled", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("bohun", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("agree", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("lastcheck", SqlType::Text),
        sqlite_column!("fcode", SqlType::Text),
    ],
    indices: &[
        ("idx_person_pname", "pname"),
        ("idx_person_fcode", "fcode"),
    ],
};

/// Bare existence of a family code.
const FAMILY_TABLE_V1: Table = Table {
    name: "family",
    columns: &[sqlite_column!(
        "fcode",
        SqlType::Text,
        is_primary_key = true,
        non_null = true
    )],
    indices: &[],
};

const CARD_TABLE_V1: Table = Table {
    name: "card",
    columns: &[
        sqlite_column!(
            "fcode",
            SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("fname", SqlType::Text),
        sqlite_column!("fidnum", SqlType::Text),
        sqlite_column!("begindate", SqlType::Text),
        sqlite_column!("enddate", SqlType::Text),
        sqlite_column!("caretype", SqlType::Text),
        sqlite_column!("cardnum", SqlType::Text),
        sqlite_column!("company", SqlType::Text),
    ],
    indices: &[],
};

const CHECKPERSON_TABLE_V1: Table = Table {
    name: "checkperson",
    columns: &[
        sqlite_column!(
            "id",
            SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("pcode", SqlType::Integer, non_null = true),
        sqlite_column!(
            "measured_at",
            SqlType::Text,
            non_null = true,
            default_value = Some("CURRENT_TIMESTAMP")
        ),
        sqlite_column!("weight", SqlType::Real),
        sqlite_column!("height", SqlType::Real),
        sqlite_column!("temperatur", SqlType::Real),
        sqlite_column!("pulse", SqlType::Integer),
        sqlite_column!("systolic", SqlType::Integer),
        sqlite_column!("diastolic", SqlType::Integer),
    ],
    indices: &[("idx_checkperson_pcode", "pcode, measured_at")],
};

const FEELOG_TABLE_V1: Table = Table {
    name: "feelog",
    columns: &[
        sqlite_column!(
            "id",
            SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("pcode", SqlType::Integer, non_null = true),
        sqlite_column!("visidate", SqlType::Text, non_null = true),
        sqlite_column!("misu", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("whanbul", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("whansu", SqlType::Integer, non_null = true, default_value = Some("0")),
    ],
    indices: &[("idx_feelog_pcode", "pcode, visidate")],
};

pub const CLINIC_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[
            PERSON_TABLE_V1,
            FAMILY_TABLE_V1,
            CARD_TABLE_V1,
            CHECKPERSON_TABLE_V1,
            FEELOG_TABLE_V1,
        ],
        migration: None,
    },
];
