mod http_runtime_test;
