pub mod mock_rest;
