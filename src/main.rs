fn main() -> anyhow::Result<()> {
    mindpatch_lib::run()
}
