pub mod block;
pub mod machine;
pub mod sample;
pub mod state;

pub use block::MemoryBlockDescriptor;
pub use machine::{machine_ref, MachineCore, MachineRef};
pub use sample::SampleMachine;
pub use state::StateFlags;
