use std::fs;

use export_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("cv.pdf", b"%PDF-first").unwrap();
    assert_eq!(first.file_name().unwrap(), "cv.pdf");
    assert_eq!(fs::read(&first).unwrap(), b"%PDF-first");

    let second = writer.write("cv.pdf", b"%PDF-second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"%PDF-second");
}

#[test]
fn no_partial_file_when_target_is_not_a_directory() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("cv.docx", b"PK").is_err());
    assert!(!file_path.with_file_name("cv.docx").exists());
}

#[tokio::test]
async fn directory_sink_saves_named_file() {
    use export_engine::{DirectorySink, DownloadSink};

    let temp = TempDir::new().unwrap();
    let sink = DirectorySink::new(temp.path().join("out"));
    sink.save("cv.pdf", "application/pdf", bytes::Bytes::from_static(b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(fs::read(temp.path().join("out/cv.pdf")).unwrap(), b"%PDF-1.4");
}
