mod faster_whisper_adapter_test;
