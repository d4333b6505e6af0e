pub mod dfs_server;
