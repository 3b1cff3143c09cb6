use heat_core::BackendKind;

fn main() -> anyhow::Result<()> {
    heat_app::main_for(BackendKind::Threaded)
}
