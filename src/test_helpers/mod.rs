pub mod mock_download_client;
pub mod mock_ui;
