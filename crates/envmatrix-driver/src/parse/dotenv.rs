//! Pulled `.env` files

use std::collections::BTreeMap;
use std::path::Path;

/// Parse dotenv text into an ordered map
///
/// Lines that fail to parse end the read; everything before them is kept.
#[must_use]
pub fn parse_dotenv(content: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        match item {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(err) => {
                tracing::warn!(error = %err, "stopping at malformed dotenv line");
                break;
            }
        }
    }
    values
}

/// Read and parse a pulled file
///
/// # Errors
/// Returns error if the file cannot be read
pub async fn parse_dotenv_file(path: &Path) -> std::io::Result<BTreeMap<String, String>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(parse_dotenv(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pulled_file() {
        let content = "# Created by Vercel CLI\n\
            API_URL=\"https://api.example.com\"\n\
            EMPTY=\"\"\n\
            MULTI=\"line1\\nline2\"\n";
        let values = parse_dotenv(content);
        assert_eq!(values["API_URL"], "https://api.example.com");
        assert_eq!(values["EMPTY"], "");
        assert_eq!(values["MULTI"], "line1\nline2");
    }

    #[tokio::test]
    async fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        tokio::fs::write(&path, "A=1\nB=two\n").await.unwrap();
        let values = parse_dotenv_file(&path).await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["B"], "two");
    }
}
