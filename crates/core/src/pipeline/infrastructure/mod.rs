pub mod frame_worker_pool;
