pub mod mock_ws;
