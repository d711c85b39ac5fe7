fn main() -> anyhow::Result<()> {
    fyyur::run()
}
