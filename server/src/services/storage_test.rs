use super::*;
use image::{ImageFormat, Rgb, RgbImage};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 80, 20]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode png");
    out
}

fn store(dir: &tempfile::TempDir) -> ImageStore {
    ImageStore::new(dir.path(), "http://localhost:3000/uploads/")
}

// =============================================================================
// validation + compression
// =============================================================================

#[test]
fn validate_rejects_bad_uploads() {
    assert!(matches!(validate_upload(&[], "a.png"), Err(StorageError::Empty)));
    assert!(matches!(
        validate_upload(&vec![0; MAX_FILE_SIZE + 1], "a.png"),
        Err(StorageError::TooLarge(_))
    ));
    assert!(matches!(validate_upload(&[1], "a.gif"), Err(StorageError::UnsupportedFormat(ext)) if ext == "gif"));
    assert!(matches!(validate_upload(&[1], "noext"), Err(StorageError::UnsupportedFormat(_))));
    assert!(validate_upload(&[1], "Dish.JPEG").is_ok());
}

#[test]
fn large_image_is_shrunk_keeping_aspect() {
    let out = compress_image(&png_bytes(1600, 800)).expect("compress");
    assert_eq!((out.width, out.height), (800, 400));
    assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
}

#[test]
fn tall_image_is_bounded_by_height() {
    let out = compress_image(&png_bytes(600, 1200)).expect("compress");
    assert_eq!((out.width, out.height), (300, 600));
}

#[test]
fn small_image_is_not_upscaled() {
    let out = compress_image(&png_bytes(120, 90)).expect("compress");
    assert_eq!((out.width, out.height), (120, 90));
}

#[test]
fn undecodable_bytes_are_invalid() {
    assert!(matches!(compress_image(b"not an image"), Err(StorageError::InvalidImage(_))));
}

#[test]
fn oversized_dimensions_are_refused_before_decoding() {
    let wide = png_bytes(MAX_DECODE_DIMENSION + 1, 1);
    assert!(wide.len() < MAX_FILE_SIZE);
    assert!(matches!(compress_image(&wide), Err(StorageError::InvalidImage(_))));
}

// =============================================================================
// store + delete
// =============================================================================

#[tokio::test]
async fn store_writes_under_owner_dir_and_returns_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let owner_id = Uuid::new_v4();

    let stored = store
        .store_menu_image(owner_id, png_bytes(40, 30), "paneer.png")
        .await
        .expect("store");

    assert!(stored.key.starts_with(&format!("{owner_id}/")));
    assert!(stored.key.ends_with(".jpg"));
    assert_eq!(stored.url, format!("http://localhost:3000/uploads/{}", stored.key));
    assert!(dir.path().join(&stored.key).exists());
}

#[tokio::test]
async fn same_picture_reuses_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let owner_id = Uuid::new_v4();

    let a = store.store_menu_image(owner_id, png_bytes(40, 30), "a.png").await.expect("store");
    let b = store.store_menu_image(owner_id, png_bytes(40, 30), "b.png").await.expect("store");
    assert_eq!(a.key, b.key);
}

#[tokio::test]
async fn delete_by_url_removes_own_files_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let owner_id = Uuid::new_v4();
    let stored = store
        .store_menu_image(owner_id, png_bytes(40, 30), "a.webp")
        .await;
    // webp extension with png bytes still decodes: the extension only gates the upload.
    let stored = stored.expect("store");

    assert!(!store.delete_by_url(owner_id, "https://cdn.example.test/x.jpg").await.expect("foreign"));
    assert!(!store.delete_by_url(owner_id, "http://localhost:3000/uploads/../etc/passwd").await.expect("escape"));
    let sneaky = format!("http://localhost:3000/uploads/{owner_id}/../{}", stored.key);
    assert!(!store.delete_by_url(owner_id, &sneaky).await.expect("dot-dot"));
    assert!(store.delete_by_url(owner_id, &stored.url).await.expect("delete"));
    assert!(!store.delete_by_url(owner_id, &stored.url).await.expect("already gone"));
    assert!(!dir.path().join(&stored.key).exists());
}

#[tokio::test]
async fn other_owners_cannot_delete_an_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&dir);
    let owner_a = Uuid::new_v4();
    let owner_b = Uuid::new_v4();
    let stored = store.store_menu_image(owner_a, png_bytes(40, 30), "a.png").await.expect("store");

    assert!(!store.is_owner_url(owner_b, &stored.url));
    assert!(!store.delete_by_url(owner_b, &stored.url).await.expect("delete"));
    assert!(dir.path().join(&stored.key).exists());

    assert!(store.is_owner_url(owner_a, &stored.url));
    assert!(!store.is_owner_url(owner_a, &format!("http://localhost:3000/uploads/{owner_a}/")));
}
