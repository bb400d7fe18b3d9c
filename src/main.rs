fn main() -> anyhow::Result<()> {
    emte::app::run()
}
