pub mod rest_server;
