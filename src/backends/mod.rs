/// Speech-to-text via whisper.cpp.
pub mod whisper;

/// Silero VAD speech-probability model (ONNX).
#[cfg(feature = "silero-onnx")]
pub mod silero;
