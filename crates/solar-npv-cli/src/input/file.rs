use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use solar_npv_core::projection::Assumptions;

/// Read a JSON or YAML file (by extension) and deserialise into a typed struct.
pub fn read_structured<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let is_yaml = canonical
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let value: T = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

/// Read price and lifetime assumptions; missing fields keep their defaults.
pub fn read_assumptions(path: &str) -> Result<Assumptions, Box<dyn std::error::Error>> {
    read_structured(path)
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("solar-npv-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_json_assumptions() {
        let path = write_temp("a.json", r#"{"export_ratio": "0.25"}"#);
        let a = read_assumptions(path.to_str().unwrap()).unwrap();
        assert_eq!(a.export_ratio, dec!(0.25));
        assert_eq!(a.electricity_price, dec!(0.10));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_yaml_assumptions() {
        let path = write_temp("a.yaml", "annual_discount_rate: \"0.035\"\nexport_rate: \"0.055\"\n");
        let a = read_assumptions(path.to_str().unwrap()).unwrap();
        assert_eq!(a.annual_discount_rate, dec!(0.035));
        assert_eq!(a.export_rate, dec!(0.055));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file() {
        assert!(read_assumptions("/definitely/not/here.json").is_err());
    }
}
