// Model download helper for the local NER model.
//
// Fetches the ONNX export of dslim/bert-base-NER (a BERT model fine-tuned on
// CoNLL-2003: PER, ORG, LOC, MISC) plus its tokenizer and label config from
// Hugging Face. Files land in a platform-appropriate directory
// (~/.local/share/trendfold/models/ on Linux) so they persist across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::onnx::{CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};

/// Hugging Face location of the ONNX export.
pub const DEFAULT_NER_MODEL_URL: &str =
    "https://huggingface.co/dslim/bert-base-NER/resolve/main/onnx";

/// Default directory for model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trendfold")
        .join("models")
}

/// Check whether every file the tagger needs is present.
pub fn model_files_present(dir: &Path) -> bool {
    [MODEL_FILE, TOKENIZER_FILE, CONFIG_FILE]
        .iter()
        .all(|file| dir.join(file).exists())
}

/// Download the NER model, tokenizer and config into `dir`.
///
/// Skips files that already exist. Shows a progress bar for the model.
pub async fn download_model(base_url: &str, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nNER model (bert-base-NER):");

    for (file, show_progress) in [(CONFIG_FILE, false), (TOKENIZER_FILE, false), (MODEL_FILE, true)] {
        let dest = dir.join(file);
        if dest.exists() {
            info!(file, "Model file already exists, skipping");
            println!("  {} (already exists)", file);
            continue;
        }

        if show_progress {
            println!("  Downloading {} (~430 MB)...", file);
        } else {
            println!("  Downloading {}...", file);
        }
        download_file(
            &format!("{}/{}", base_url.trim_end_matches('/'), file),
            &dest,
            show_progress,
        )
        .await?;
    }

    Ok(())
}

/// Fetch `url` into `dest`. The body lands in a `.part` sibling first and is
/// renamed into place only once fully written, so an interrupted download
/// never passes `model_files_present`.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let progress = if show_progress {
        Some(progress_bar(response.content_length())?)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read response body from {}", url))?;
    if let Some(pb) = &progress {
        pb.set_position(bytes.len() as u64);
    }

    let written = write_then_rename(dest, &bytes);
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    written?;

    info!(url, dest = %dest.display(), bytes = bytes.len(), "Downloaded model file");
    Ok(())
}

/// Byte bar when the size is known, spinner otherwise.
fn progress_bar(total: Option<u64>) -> Result<ProgressBar> {
    let pb = match total {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .context("Invalid progress bar template")?
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .context("Invalid spinner template")?,
            );
            pb
        }
    };
    Ok(pb)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Write `bytes` to `dest` via a `.part` file. On failure the partial file is
/// removed and `dest` is left untouched.
fn write_then_rename(dest: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(dest);
    let result = std::fs::write(&partial, bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))
        .and_then(|()| {
            std::fs::rename(&partial, dest).with_context(|| {
                format!("Failed to move {} into place", partial.display())
            })
        });
    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_trendfold() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("trendfold") && path_str.contains("models"),
            "Expected path containing trendfold/models, got: {path_str}"
        );
    }

    #[test]
    fn test_model_files_present_false_when_missing() {
        let dir = std::env::temp_dir().join("trendfold-test-nonexistent");
        assert!(!model_files_present(&dir));
    }

    #[test]
    fn test_model_files_present_needs_every_file() {
        let dir = std::env::temp_dir().join("trendfold-download-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MODEL_FILE), b"fake").unwrap();
        std::fs::write(dir.join(TOKENIZER_FILE), b"fake").unwrap();
        assert!(!model_files_present(&dir));

        std::fs::write(dir.join(CONFIG_FILE), b"{}").unwrap();
        assert!(model_files_present(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_then_rename_leaves_no_partial_file() {
        let dir = std::env::temp_dir().join("trendfold-download-rename-test");
        std::fs::create_dir_all(&dir).unwrap();
        let dest = dir.join(MODEL_FILE);

        write_then_rename(&dest, b"weights").unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"weights");
        assert!(!partial_path(&dest).exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_write_does_not_count_as_present() {
        let dir = std::env::temp_dir().join("trendfold-download-missing-dir-test");
        let _ = std::fs::remove_dir_all(&dir);
        let dest = dir.join(MODEL_FILE);

        // Parent directory doesn't exist, so the write fails
        assert!(write_then_rename(&dest, b"weights").is_err());
        assert!(!dest.exists());
        assert!(!model_files_present(&dir));
    }

    #[test]
    fn test_leftover_partial_file_is_not_the_model() {
        let dir = std::env::temp_dir().join("trendfold-download-partial-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(TOKENIZER_FILE), b"{}").unwrap();
        std::fs::write(dir.join(CONFIG_FILE), b"{}").unwrap();
        std::fs::write(partial_path(&dir.join(MODEL_FILE)), b"trunc").unwrap();

        assert!(!model_files_present(&dir));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        let dest = Path::new("/models/model.onnx");
        assert_eq!(partial_path(dest), Path::new("/models/model.onnx.part"));
    }
}
