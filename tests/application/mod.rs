mod format_renderer_test;
mod transcription_service_test;
