//! Settings token codec.
//!
//! A token is the base64 (standard alphabet, padded) encoding of the settings
//! serialized as a JSON object with camelCase keys in declaration order, e.g.
//! `{"n":2,"gridRows":1,"gridCols":1,"gridRes":3,"intensity":95,"intervalMs":3000,"flashMs":600}`.
//!
//! Decoding fully replaces a settings record: absent fields take their
//! defaults, unknown fields are ignored. Numeric fields may be JSON numbers or
//! numeric strings but must be finite integers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::settings::{Settings, MAX_INTENSITY};

pub fn encode(settings: &Settings) -> Result<String> {
    let json = serde_json::to_vec(settings).map_err(|e| Error::InvalidSaveData(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

pub fn decode(token: &str) -> Result<Settings> {
    let compact: String = token.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(Error::InvalidSaveData("empty token".to_string()));
    }

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::InvalidSaveData(format!("base64: {e}")))?;
    let text =
        String::from_utf8(bytes).map_err(|e| Error::InvalidSaveData(format!("utf-8: {e}")))?;
    let value: Value =
        serde_json::from_str(&text).map_err(|e| Error::InvalidSaveData(format!("json: {e}")))?;
    let Value::Object(map) = value else {
        return Err(Error::InvalidSaveData(
            "json: expected an object".to_string(),
        ));
    };

    let d = Settings::default();
    let settings = Settings {
        n: positive(&map, "n", d.n)?,
        grid_rows: positive(&map, "gridRows", d.grid_rows)?,
        grid_cols: positive(&map, "gridCols", d.grid_cols)?,
        grid_res: positive(&map, "gridRes", d.grid_res)?,
        intensity: intensity(&map, d.intensity)?,
        interval_ms: positive(&map, "intervalMs", d.interval_ms)?,
        flash_ms: positive(&map, "flashMs", d.flash_ms)?,
    };

    settings
        .validate()
        .map_err(|e| Error::InvalidSaveData(e.to_string()))?;
    Ok(settings)
}

fn positive(map: &Map<String, Value>, key: &str, default: u32) -> Result<u32> {
    let Some(v) = map.get(key) else {
        return Ok(default);
    };
    let i = integer(key, v)?;
    if i < 1 {
        return Err(Error::InvalidSaveData(format!("{key}: must be at least 1")));
    }
    u32::try_from(i).map_err(|_| Error::InvalidSaveData(format!("{key}: too large")))
}

fn intensity(map: &Map<String, Value>, default: u8) -> Result<u8> {
    let Some(v) = map.get("intensity") else {
        return Ok(default);
    };
    let i = integer("intensity", v)?;
    Ok(i.clamp(0, i64::from(MAX_INTENSITY)) as u8)
}

fn integer(key: &str, v: &Value) -> Result<i64> {
    let parsed = match v {
        Value::Number(num) => num
            .as_i64()
            .or_else(|| num.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    };
    parsed.ok_or_else(|| Error::InvalidSaveData(format!("{key}: not a finite integer: {v}")))
}

fn integral_f64(f: f64) -> Option<i64> {
    // Bounds are exactly representable as f64.
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_of(json: &str) -> String {
        STANDARD.encode(json.as_bytes())
    }

    #[test]
    fn default_token_is_stable() {
        let a = encode(&Settings::default()).unwrap();
        let b = encode(&Settings::default()).unwrap();
        assert_eq!(a, b);

        let json = String::from_utf8(STANDARD.decode(&a).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"n":2,"gridRows":1,"gridCols":1,"gridRes":3,"intensity":95,"intervalMs":3000,"flashMs":600}"#
        );
    }

    #[test]
    fn decode_inverts_encode() {
        let samples = [
            Settings::default(),
            Settings::default()
                .with_n(4)
                .with_grid(2, 3, 5)
                .with_timing(1500, 300),
            Settings {
                intensity: 0,
                ..Settings::default().with_grid(1, 1, 1)
            },
        ];
        for s in samples {
            assert_eq!(decode(&encode(&s).unwrap()), Ok(s));
        }
    }

    #[test]
    fn absent_fields_take_defaults() {
        let s = decode(&token_of(r#"{"n":3,"gridCols":2}"#)).unwrap();
        assert_eq!(
            s,
            Settings {
                n: 3,
                grid_cols: 2,
                ..Settings::default()
            }
        );
        assert_eq!(decode(&token_of("{}")), Ok(Settings::default()));
    }

    #[test]
    fn numeric_strings_and_unknown_fields_are_accepted() {
        let s = decode(&token_of(
            r#"{"n":"3","intensity":"40","version":"0.8.1","gridRes":4.0}"#,
        ))
        .unwrap();
        assert_eq!(s.n, 3);
        assert_eq!(s.intensity, 40);
        assert_eq!(s.grid_res, 4);
    }

    #[test]
    fn intensity_is_clamped() {
        assert_eq!(
            decode(&token_of(r#"{"intensity":250}"#)).unwrap().intensity,
            100
        );
        assert_eq!(decode(&token_of(r#"{"intensity":-3}"#)).unwrap().intensity, 0);
    }

    #[test]
    fn invalid_tokens_are_rejected() {
        let bad = [
            String::new(),
            "   ".to_string(),
            "not base64!".to_string(),
            token_of("not json"),
            token_of("[1,2,3]"),
            token_of(r#"{"n":0}"#),
            token_of(r#"{"n":-1}"#),
            token_of(r#"{"n":2.5}"#),
            token_of(r#"{"n":null}"#),
            token_of(r#"{"n":true}"#),
            token_of(r#"{"n":"two"}"#),
            token_of(r#"{"gridRows":0}"#),
            token_of(r#"{"intervalMs":0}"#),
            token_of(r#"{"flashMs":"NaN"}"#),
            token_of(r#"{"gridRes":4294967296}"#),
        ];
        for t in bad {
            assert!(
                matches!(decode(&t), Err(Error::InvalidSaveData(_))),
                "token {t:?} should be rejected"
            );
        }
    }

    #[test]
    fn grids_too_large_to_run_are_rejected() {
        for json in [
            r#"{"gridRows":4294967295,"gridCols":4294967295,"gridRes":1}"#,
            r#"{"gridRows":65536,"gridCols":65536}"#,
            r#"{"gridRes":65535}"#,
        ] {
            assert!(
                matches!(decode(&token_of(json)), Err(Error::InvalidSaveData(_))),
                "{json} should be rejected"
            );
        }
        assert_eq!(
            decode(&token_of(r#"{"gridRows":32,"gridCols":32,"gridRes":256}"#)),
            Ok(Settings::default().with_grid(32, 32, 256))
        );
    }

    #[test]
    fn whitespace_from_copy_paste_is_ignored() {
        let t = encode(&Settings::default()).unwrap();
        let (a, b) = t.split_at(10);
        assert_eq!(decode(&format!("  {a}\n{b}  ")), Ok(Settings::default()));
    }
}
