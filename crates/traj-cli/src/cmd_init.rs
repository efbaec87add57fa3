use traj_store::FileStorage;

pub fn execute(store: &FileStorage) -> anyhow::Result<()> {
    let paths = store.paths();
    let existed = paths.is_initialized();
    // Also restores a missing index on an existing layout.
    store.initialize()?;
    if existed {
        println!("Already initialized at {}", paths.root.display());
    } else {
        println!("Initialized trajectory store at {}", paths.root.display());
    }
    Ok(())
}

pub fn reindex(store: &FileStorage) -> anyhow::Result<()> {
    let count = store.rebuild_index()?;
    println!("Indexed {count} trajectories");
    Ok(())
}
