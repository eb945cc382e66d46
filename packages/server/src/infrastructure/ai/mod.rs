mod echo;

pub use echo::EchoAiGenerator;
