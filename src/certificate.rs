use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Certificate, CertificateVerification};

/// Human-readable, system-unique code: `<PREFIX>-<YYYYMMDD>-<16 hex>`.
///
/// The random part carries 64 bits from a v4 uuid; the store still enforces
/// uniqueness on the code column.
pub fn generate_code(prefix: &str, now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), &random[..16])
}

/// A certificate that has not been persisted yet and has no artifact.
pub fn draft(
    user_id: &str,
    course_id: Uuid,
    instructor_name: Option<String>,
    code_prefix: &str,
    now: DateTime<Utc>,
) -> Certificate {
    Certificate {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        course_id,
        code: generate_code(code_prefix, now),
        issued_at: now,
        instructor_name,
        artifact_file_id: None,
    }
}

pub fn verification(found: Option<Certificate>) -> CertificateVerification {
    match found {
        Some(cert) => CertificateVerification {
            valid: true,
            certificate: Some(cert),
            message: "certificate is valid".to_string(),
        },
        None => CertificateVerification {
            valid: false,
            certificate: None,
            message: "certificate not found".to_string(),
        },
    }
}
