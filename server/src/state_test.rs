use super::*;

#[tokio::test]
async fn new_state_wires_config_into_services() {
    let state = test_helpers::test_app_state();

    assert_eq!(state.tables.table_numbers().len(), usize::from(state.config.table_count));
    assert_eq!(state.feed.total_subscribers().await, 0);
    assert!(state.google.is_none());
    assert_eq!(state.images.root(), state.config.upload_dir.as_path());
}

#[tokio::test]
async fn checkout_settings_follow_config() {
    let state = test_helpers::test_app_state();
    let settings = state.checkout_settings();

    assert_eq!(settings.gst_rate, state.config.gst_rate);
    assert!(!settings.inter_state);
    assert_eq!(settings.table_count, state.config.table_count);
}

#[tokio::test]
async fn clones_share_services() {
    let state = test_helpers::test_app_state();
    let clone = state.clone();

    let (token, _) = state.tables.ensure(None).await;
    assert!(clone.tables.get(&token).await.is_some());
}

#[tokio::test]
async fn google_state_carries_config() {
    let state = test_helpers::test_app_state_with_google();
    let google = state.google.as_ref().expect("google configured");
    assert!(google.authorize_url("xyz").contains("client_id=test-client"));
}
