use super::codes::{CoverageType, Sex};
use super::numeric::{parse_decimal, parse_integer};
use super::resident_id::{split_resident_id, ResidentIdSplit, PREFIX_LEN, SUFFIX_LEN};
use super::{FieldErrors, InputBag};
use crate::records::{CardFields, PatientFields, PaymentFields, VitalFields};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Patient,
    FamilyCard,
    Vital,
    Payment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalFields {
    Patient(PatientFields),
    FamilyCard(CardFields),
    Vital(VitalFields),
    Payment(PaymentFields),
}

/// Normalizes `input` as a record of the given kind.
pub fn normalize(kind: RecordKind, input: &Value) -> Result<CanonicalFields, FieldErrors> {
    Ok(match kind {
        RecordKind::Patient => CanonicalFields::Patient(normalize_patient(input)?.1),
        RecordKind::FamilyCard => CanonicalFields::FamilyCard(normalize_card(input)?),
        RecordKind::Vital => CanonicalFields::Vital(normalize_vital(input)?),
        RecordKind::Payment => CanonicalFields::Payment(normalize_payment(input)?),
    })
}

/// Parses a record identifier such as a `pcode`: a positive integer.
pub fn normalize_record_id(raw: &str) -> Result<i64, String> {
    match parse_integer(raw.trim()) {
        Ok(id) if id > 0 => Ok(id),
        Ok(_) => Err("must be a positive number".to_string()),
        Err(reason) => Err(reason),
    }
}

fn code<T>(
    bag: &mut InputBag,
    field: &'static str,
    parse: fn(&str) -> Option<T>,
    allowed: &str,
) -> Option<T> {
    bag.parsed(field, |raw| {
        parse(raw).ok_or_else(|| format!("must be one of {}", allowed))
    })
}

fn positive_decimal(raw: &str) -> Result<f64, String> {
    let value = parse_decimal(raw)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err("must be greater than zero".to_string())
    }
}

fn is_opaque(raw: &str) -> bool {
    split_resident_id(raw) == ResidentIdSplit::Opaque
}

/// A `pidnum2` given on its own: 7 digits, or an opaque value.
fn standalone_suffix(bag: &mut InputBag, given: String, opaque: bool) -> Option<String> {
    if opaque || given.len() == SUFFIX_LEN {
        Some(given)
    } else {
        bag.reject("pidnum2", format!("expected {} digits", SUFFIX_LEN));
        None
    }
}

/// Reads `pidnum` / `pidnum2`. A full 13-digit number in `pidnum` is split;
/// opaque values are kept exactly as given.
fn read_resident_id(bag: &mut InputBag) -> (Option<String>, Option<String>) {
    let first = bag.text("pidnum");
    let second = bag.text("pidnum2");
    let second_opaque = second.as_deref().map(is_opaque).unwrap_or(false);

    let (prefix, derived_suffix) = match first.as_deref().map(split_resident_id) {
        None => (None, None),
        Some(ResidentIdSplit::Opaque) => {
            let suffix = second.and_then(|given| standalone_suffix(bag, given, second_opaque));
            return (first, suffix);
        }
        Some(ResidentIdSplit::Full { prefix, suffix }) => (Some(prefix), Some(suffix)),
        Some(ResidentIdSplit::PrefixOnly(prefix)) => (Some(prefix), None),
        Some(ResidentIdSplit::Ambiguous) => {
            bag.reject("pidnum", "expected 6 digits or a full 13-digit number");
            return (None, None);
        }
    };

    let suffix = match (derived_suffix, second) {
        (Some(derived), Some(given)) if derived != given => {
            bag.reject("pidnum2", "does not match the number given in pidnum");
            None
        }
        (Some(derived), _) => Some(derived),
        (None, Some(given)) => standalone_suffix(bag, given, second_opaque),
        (None, None) => None,
    };

    if let (Some(prefix), Some(_)) = (&prefix, &suffix) {
        if prefix.len() != PREFIX_LEN && !second_opaque {
            bag.reject("pidnum", format!("expected {} digits", PREFIX_LEN));
        }
    }
    (prefix, suffix)
}

/// Normalizes a patient body. The optional `pcode` names the patient being
/// updated.
pub fn normalize_patient(input: &Value) -> Result<(Option<i64>, PatientFields), FieldErrors> {
    let mut bag = InputBag::new(input)?;

    let pcode = bag.parsed("pcode", normalize_record_id);
    let name = bag.required_text("pname");
    let birth_date = if bag.value("pbirth").is_none() {
        bag.reject("pbirth", "is required");
        None
    } else {
        bag.date("pbirth")
    };
    let (id_prefix, id_suffix) = read_resident_id(&mut bag);
    let sex = if bag.value("sex").is_none() {
        bag.reject("sex", "is required");
        None
    } else {
        code(&mut bag, "sex", Sex::parse, "M, F")
    };
    let relation = bag.text("relation");
    let family_code = bag.text("fcode");
    let disabled = bag.flag("crippled");
    let benefit_restricted = bag.flag("bohun");
    let consent = bag.flag("agree");

    bag.finish(|| {
        Some((
            pcode,
            PatientFields {
                name: name?,
                birth_date: birth_date?,
                id_prefix,
                id_suffix,
                sex: sex?,
                relation,
                family_code,
                disabled,
                benefit_restricted,
                consent,
            },
        ))
    })
}

pub fn normalize_card(input: &Value) -> Result<CardFields, FieldErrors> {
    let mut bag = InputBag::new(input)?;

    let family_code = bag.required_text("fcode");
    let head_name = bag.text("fname");
    let head_id = bag.text("fidnum");
    if let Some(raw) = head_id.as_deref() {
        if split_resident_id(raw) == ResidentIdSplit::Ambiguous {
            bag.reject("fidnum", "expected 6 digits or a full 13-digit number");
        }
    }
    let begin_date = bag.date("begindate");
    let end_date = bag.date("enddate");
    if let (Some(begin), Some(end)) = (begin_date, end_date) {
        if begin > end {
            bag.reject("enddate", "must not be earlier than begindate");
        }
    }
    let coverage = code(&mut bag, "caretype", CoverageType::parse, "1, 2");
    let card_number = bag.text("cardnum");
    let company = bag.text("company");

    bag.finish(|| {
        Some(CardFields {
            family_code: family_code?,
            head_name,
            head_id,
            begin_date,
            end_date,
            coverage,
            card_number,
            company,
        })
    })
}

pub fn normalize_vital(input: &Value) -> Result<VitalFields, FieldErrors> {
    let mut bag = InputBag::new(input)?;

    let fields = VitalFields {
        weight: bag.parsed("weight", positive_decimal),
        height: bag.parsed("height", positive_decimal),
        temperature: bag.parsed("temperatur", parse_decimal),
        pulse: bag.parsed("pulse", parse_integer),
        systolic: bag.parsed("systolic", parse_integer),
        diastolic: bag.parsed("diastolic", parse_integer),
    };

    bag.finish(|| Some(fields))
}

pub fn normalize_payment(input: &Value) -> Result<PaymentFields, FieldErrors> {
    let mut bag = InputBag::new(input)?;

    let patient_id = if bag.value("pcode").is_none() {
        bag.reject("pcode", "is required");
        None
    } else {
        bag.parsed("pcode", normalize_record_id)
    };
    let visit_date = bag.date("visidate");
    let outstanding = bag.parsed("misu", parse_integer);
    let settled_full = bag.parsed("whanbul", parse_integer);
    let settled_partial = bag.parsed("whansu", parse_integer);

    bag.finish(|| {
        Some(PaymentFields {
            patient_id: patient_id?,
            visit_date,
            outstanding,
            settled_full,
            settled_partial,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::FieldError;
    use chrono::NaiveDate;
    use serde_json::json;

    fn fields_of(errors: &FieldErrors) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    fn valid_patient() -> Value {
        json!({
            "pname": "홍길동",
            "pbirth": "19900101",
            "pidnum": "900101",
            "pidnum2": "1234567",
            "sex": "M",
            "relation": "본인",
            "crippled": 0,
            "bohun": "1",
            "agree": true
        })
    }

    #[test]
    fn patient_is_normalized() {
        let (pcode, fields) = normalize_patient(&valid_patient()).unwrap();
        assert_eq!(pcode, None);
        assert_eq!(fields.name, "홍길동");
        assert_eq!(fields.birth_date, NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        assert_eq!(fields.id_prefix.as_deref(), Some("900101"));
        assert_eq!(fields.id_suffix.as_deref(), Some("1234567"));
        assert_eq!(fields.sex, Sex::Male);
        assert!(!fields.disabled);
        assert!(fields.benefit_restricted);
        assert!(fields.consent);
    }

    #[test]
    fn patient_pcode_may_be_number_or_string() {
        let mut body = valid_patient();
        body["pcode"] = json!(17);
        assert_eq!(normalize_patient(&body).unwrap().0, Some(17));
        body["pcode"] = json!("17");
        assert_eq!(normalize_patient(&body).unwrap().0, Some(17));
        body["pcode"] = json!("abc");
        assert_eq!(fields_of(&normalize_patient(&body).unwrap_err()), vec!["pcode"]);
    }

    #[test]
    fn every_failure_is_reported() {
        let errors = normalize_patient(&json!({
            "pname": "  ",
            "pbirth": "someday",
            "sex": "X",
            "agree": "perhaps"
        }))
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["pname", "pbirth", "sex", "agree"]);
        assert_eq!(errors[0], FieldError::new("pname", "is required"));
    }

    #[test]
    fn missing_birth_date_and_sex_are_required() {
        let errors = normalize_patient(&json!({"pname": "김"})).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["pbirth", "sex"]);
    }

    #[test]
    fn full_resident_id_is_split() {
        let mut body = valid_patient();
        body["pidnum"] = json!("9001011234567");
        body.as_object_mut().unwrap().remove("pidnum2");
        let (_, fields) = normalize_patient(&body).unwrap();
        assert_eq!(fields.id_prefix.as_deref(), Some("900101"));
        assert_eq!(fields.id_suffix.as_deref(), Some("1234567"));
    }

    #[test]
    fn conflicting_suffix_is_rejected() {
        let mut body = valid_patient();
        body["pidnum"] = json!("9001011234567");
        body["pidnum2"] = json!("7654321");
        assert_eq!(fields_of(&normalize_patient(&body).unwrap_err()), vec!["pidnum2"]);
    }

    #[test]
    fn opaque_resident_id_is_untouched() {
        let token = "gAAAAABk3x9Q0c8mJxg2fXxV5r6d2c1Y7b8a9Z0y1X2w3V4u5T6s7R8q9P0o1N2m3L4k5==";
        let mut body = valid_patient();
        body["pidnum"] = json!(token);
        body["pidnum2"] = json!(token);
        let (_, fields) = normalize_patient(&body).unwrap();
        assert_eq!(fields.id_prefix.as_deref(), Some(token));
        assert_eq!(fields.id_suffix.as_deref(), Some(token));
    }

    #[test]
    fn suffix_next_to_opaque_id_is_still_checked() {
        let token = "gAAAAABk3x9Q0c8mJxg2fXxV5r6d2c1Y7b8a9Z0y1X2w3V4u5T6s7R8q9P0o1N2m3L4k5==";
        let mut body = valid_patient();
        body["pidnum"] = json!(token);
        body["pidnum2"] = json!("12");
        assert_eq!(fields_of(&normalize_patient(&body).unwrap_err()), vec!["pidnum2"]);

        body["pidnum2"] = json!("1234567");
        let (_, fields) = normalize_patient(&body).unwrap();
        assert_eq!(fields.id_prefix.as_deref(), Some(token));
        assert_eq!(fields.id_suffix.as_deref(), Some("1234567"));
    }

    #[test]
    fn numeric_birth_date_is_read_as_compact_date() {
        let mut body = valid_patient();
        body["pbirth"] = json!(19850315);
        let (_, fields) = normalize_patient(&body).unwrap();
        assert_eq!(fields.birth_date, NaiveDate::from_ymd_opt(1985, 3, 15).unwrap());
    }

    #[test]
    fn ambiguous_and_malformed_segments_are_rejected() {
        let mut body = valid_patient();
        body["pidnum"] = json!("90010112");
        assert_eq!(fields_of(&normalize_patient(&body).unwrap_err()), vec!["pidnum"]);

        let mut body = valid_patient();
        body["pidnum2"] = json!("12345");
        assert_eq!(fields_of(&normalize_patient(&body).unwrap_err()), vec!["pidnum2"]);

        let mut body = valid_patient();
        body["pidnum"] = json!("9001");
        assert_eq!(fields_of(&normalize_patient(&body).unwrap_err()), vec!["pidnum"]);
    }

    #[test]
    fn card_dates_must_be_ordered() {
        let errors = normalize_card(&json!({
            "fcode": "F-1",
            "begindate": "2024-12-31",
            "enddate": "2024-01-01"
        }))
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["enddate"]);
    }

    #[test]
    fn card_is_normalized() {
        let card = normalize_card(&json!({
            "fcode": "F-1",
            "fname": "이순신",
            "fidnum": "4504281234567",
            "begindate": {"year": 2024, "month": 3, "day": 1},
            "enddate": "20250228",
            "caretype": 2,
            "cardnum": "",
            "company": "조선수군"
        }))
        .unwrap();
        assert_eq!(card.family_code, "F-1");
        assert_eq!(card.begin_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(card.end_date, NaiveDate::from_ymd_opt(2025, 2, 28));
        assert_eq!(card.coverage, Some(CoverageType::MedicalAid));
        assert_eq!(card.card_number, None);
    }

    #[test]
    fn card_requires_family_code_and_known_coverage() {
        let errors = normalize_card(&json!({"caretype": "3"})).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["fcode", "caretype"]);
    }

    #[test]
    fn vitals_accept_numeric_strings_and_numbers() {
        let vital = normalize_vital(&json!({
            "weight": "70.5",
            "height": 175,
            "temperatur": "36.6",
            "pulse": "72",
            "systolic": 120
        }))
        .unwrap();
        assert_eq!(vital.weight, Some(70.5));
        assert_eq!(vital.height, Some(175.0));
        assert_eq!(vital.pulse, Some(72));
        assert_eq!(vital.systolic, Some(120));
        assert_eq!(vital.diastolic, None);
    }

    #[test]
    fn vitals_reject_loose_numbers() {
        let errors = normalize_vital(&json!({
            "weight": "0",
            "height": "-170",
            "temperatur": "36,5",
            "pulse": "72.5"
        }))
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["weight", "height", "temperatur", "pulse"]);
    }

    #[test]
    fn payment_amounts_are_optional() {
        let payment = normalize_payment(&json!({"pcode": "3", "misu": "15000"})).unwrap();
        assert_eq!(payment.patient_id, 3);
        assert_eq!(payment.outstanding, Some(15000));
        assert_eq!(payment.settled_full, None);
        assert_eq!(payment.visit_date, None);
    }

    #[test]
    fn payment_requires_patient_and_whole_amounts() {
        let errors = normalize_payment(&json!({"whansu": "10.5"})).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["pcode", "whansu"]);
    }

    #[test]
    fn dispatch_by_kind() {
        let fields = normalize(RecordKind::Vital, &json!({"pulse": 60})).unwrap();
        assert!(matches!(fields, CanonicalFields::Vital(VitalFields { pulse: Some(60), .. })));
        assert!(normalize(RecordKind::Payment, &json!("not an object")).is_err());
    }

    #[test]
    fn record_ids_must_be_positive() {
        assert_eq!(normalize_record_id("12"), Ok(12));
        assert!(normalize_record_id("0").is_err());
        assert!(normalize_record_id("-3").is_err());
        assert!(normalize_record_id("x1").is_err());
    }
}
