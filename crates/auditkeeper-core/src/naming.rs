/// File and folder naming for generated artifacts.
///
/// Result workbooks are named `<algorithm>_<inputBase>_<YYYYMMDDHHMMSS>.xlsx`
/// and export snapshots `历史记录备份_<YYYYMMDD_HHMMSS>`, both in local time.
use crate::model::Algorithm;
use chrono::{DateTime, TimeZone};
use std::path::Path;

/// Extension of every generated result workbook.
pub const RESULT_EXTENSION: &str = "xlsx";

/// Prefix of an export snapshot folder ("history backup").
pub const BACKUP_FOLDER_PREFIX: &str = "历史记录备份";

/// Name of the workbook an analysis of `input` writes at `at`.
pub fn output_file_name<Tz: TimeZone>(
    algorithm: Algorithm,
    input: &Path,
    at: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}_{}.{}",
        algorithm.file_label(),
        input_base_name(input),
        at.format("%Y%m%d%H%M%S"),
        RESULT_EXTENSION
    )
}

/// Snapshot folder name for an export started at `at`.
pub fn backup_folder_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}", BACKUP_FOLDER_PREFIX, at.format("%Y%m%d_%H%M%S"))
}

/// `name` with ` (n)` inserted before the extension.
pub fn numbered_file_name(name: &str, n: usize) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{} ({}).{}",
            stem.to_string_lossy(),
            n,
            ext.to_string_lossy()
        ),
        _ => format!("{name} ({n})"),
    }
}

/// Input file stem, or `input` when the path has none.
fn input_base_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn output_name_uses_label_stem_and_compact_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let name = output_file_name(
            Algorithm::BalanceMethod,
            Path::new("/in/公司流水.xlsx"),
            &at,
        );
        assert_eq!(name, "BalanceMethod_公司流水_20240309140507.xlsx");
    }

    #[test]
    fn backup_folder_name_has_underscore_separated_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 1).unwrap();
        assert_eq!(backup_folder_name(&at), "历史记录备份_20241231_235901");
    }

    #[test]
    fn numbered_names_keep_the_extension() {
        assert_eq!(numbered_file_name("a.xlsx", 2), "a (2).xlsx");
        assert_eq!(numbered_file_name("README", 3), "README (3)");
    }
}
