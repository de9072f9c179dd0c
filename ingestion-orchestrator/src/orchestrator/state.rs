use state_machines::state_machine;

state_machine! {
    name: UploadMachine,
    state: UploadState,
    initial: Ready,
    states: [Ready, Validated, Executed, Merged, Verified, Failed],
    events {
        validate { transition: { from: Ready, to: Validated } }
        execute { transition: { from: Validated, to: Executed } }
        merge { transition: { from: Executed, to: Merged } }
        verify { transition: { from: Merged, to: Verified } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: Validated, to: Failed }
            transition: { from: Executed, to: Failed }
            transition: { from: Merged, to: Failed }
            transition: { from: Verified, to: Failed }
        }
    }
}

pub fn ready() -> UploadMachine<(), Ready> {
    UploadMachine::new(())
}
