//! The cluster-level API: routes each operation to the shard(s) that
//! own it and drives the cross-shard fan-out (catalog replication,
//! adjacency updates on both endpoints of a relationship, cascading
//! deletes) that a single shard cannot do on its own.

use crate::shard::{spawn, ShardHandle, ShardThread};
use crate::Error;
use graph_property::PropertyKind;
use graph_store::{Node, Relationship, RemovedNode};

/// Type catalogs are owned by shard 0 and replicated to every other
/// shard by [`Cluster::create_node_type`]/[`Cluster::create_relationship_type`].
const CATALOG_SHARD: u16 = 0;

pub struct Cluster {
    threads: Vec<ShardThread>,
}

impl Cluster {
    /// Spawns `shard_count` shard actors, each on its own OS thread.
    pub fn spawn(shard_count: u16) -> Self {
        assert!(shard_count > 0, "a cluster needs at least one shard");
        let threads = (0..shard_count).map(spawn).collect();
        Self { threads }
    }

    pub fn shard_count(&self) -> u16 {
        self.threads.len() as u16
    }

    fn handle(&self, shard: u16) -> &ShardHandle {
        &self.threads[shard as usize].handle
    }

    fn handles(&self) -> impl Iterator<Item = &ShardHandle> {
        self.threads.iter().map(|t| &t.handle)
    }

    /// The broadcast half of the peered protocol: runs `f` on every
    /// shard concurrently and waits for all of them to acknowledge,
    /// mirroring the spec's `invoke_on_all(fn) -> future<vec<T>>`.
    async fn invoke_on_all<R, F>(&self, f: F) -> Result<Vec<R>, Error>
    where
        F: Fn(&mut crate::shard::ShardState) -> R + Clone + Send + 'static,
        R: Send + 'static,
    {
        let calls = self.handles().map(|handle| {
            let f = f.clone();
            handle.invoke(move |state| f(state))
        });
        futures::future::try_join_all(calls).await
    }

    /// Stops every shard actor and waits for its thread to exit.
    pub fn shutdown(self) {
        for thread in self.threads {
            thread.join();
        }
    }

    fn shard_of_key(&self, type_name: &str, key: &str) -> u16 {
        graph_id::route(type_name, key, self.shard_count())
    }

    // -- type catalogs ------------------------------------------------------

    /// Assigns `name` a node type id on the catalog shard, then
    /// broadcasts that exact `(name, id)` mapping to every shard
    /// (including the catalog shard itself, where it lands as a no-op
    /// idempotent replay) so a type id means the same thing everywhere
    /// in the cluster by the time this call returns.
    pub async fn create_node_type(&self, name: &str) -> Result<u16, Error> {
        let name = name.to_string();
        let id = self
            .handle(CATALOG_SHARD)
            .invoke({
                let name = name.clone();
                move |state| state.nodes.type_insert(&name)
            })
            .await??;

        self.invoke_on_all(move |state| state.nodes.type_assert(&name, id))
            .await?
            .into_iter()
            .collect::<Result<Vec<bool>, _>>()?;
        Ok(id)
    }

    pub async fn create_relationship_type(&self, name: &str) -> Result<u16, Error> {
        let name = name.to_string();
        let id = self
            .handle(CATALOG_SHARD)
            .invoke({
                let name = name.clone();
                move |state| state.relationships.type_insert(&name)
            })
            .await??;

        self.invoke_on_all(move |state| state.relationships.type_assert(&name, id))
            .await?
            .into_iter()
            .collect::<Result<Vec<bool>, _>>()?;
        Ok(id)
    }

    async fn node_type_id(&self, name: &str) -> Result<u16, Error> {
        self.handle(CATALOG_SHARD)
            .invoke({
                let name = name.to_string();
                move |state| state.nodes.type_lookup_id(&name)
            })
            .await?
            .ok_or_else(|| Error::UnknownType {
                name: name.to_string(),
            })
    }

    async fn relationship_type_id(&self, name: &str) -> Result<u16, Error> {
        self.handle(CATALOG_SHARD)
            .invoke({
                let name = name.to_string();
                move |state| state.relationships.type_lookup_id(&name)
            })
            .await?
            .ok_or_else(|| Error::UnknownType {
                name: name.to_string(),
            })
    }

    /// `insert(name) -> id` from the external interface: an alias for
    /// [`Cluster::create_node_type`] kept for callers that think in
    /// terms of "look up or create this type name".
    pub async fn node_type_insert(&self, name: &str) -> Result<u16, Error> {
        self.create_node_type(name).await
    }

    pub async fn node_type_get_id(&self, name: &str) -> Result<u16, Error> {
        self.node_type_id(name).await
    }

    pub async fn node_type_get_name(&self, id: u16) -> Result<Option<String>, Error> {
        Ok(self
            .handle(CATALOG_SHARD)
            .invoke(move |state| state.nodes.type_lookup_name(id).map(str::to_string))
            .await?)
    }

    pub async fn node_type_list(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .handle(CATALOG_SHARD)
            .invoke(|state| state.nodes.type_list_names().map(str::to_string).collect())
            .await?)
    }

    /// Sums live counts across every shard: nodes of one type are
    /// scattered across the whole cluster by key hash, so shard 0's
    /// count alone would only ever be a fraction of the true total.
    pub async fn node_type_count(&self, type_id: u16) -> Result<u64, Error> {
        let counts = self
            .invoke_on_all(move |state| state.nodes.type_count(type_id))
            .await?;
        Ok(counts.into_iter().sum())
    }

    pub async fn relationship_type_insert(&self, name: &str) -> Result<u16, Error> {
        self.create_relationship_type(name).await
    }

    pub async fn relationship_type_get_id(&self, name: &str) -> Result<u16, Error> {
        self.relationship_type_id(name).await
    }

    pub async fn relationship_type_get_name(&self, id: u16) -> Result<Option<String>, Error> {
        Ok(self
            .handle(CATALOG_SHARD)
            .invoke(move |state| state.relationships.type_lookup_name(id).map(str::to_string))
            .await?)
    }

    pub async fn relationship_type_list(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .handle(CATALOG_SHARD)
            .invoke(|state| state.relationships.type_list_names().map(str::to_string).collect())
            .await?)
    }

    pub async fn relationship_type_count(&self, type_id: u16) -> Result<u64, Error> {
        let counts = self
            .invoke_on_all(move |state| state.relationships.type_count(type_id))
            .await?;
        Ok(counts.into_iter().sum())
    }

    pub async fn node_schema_add(
        &self,
        type_name: &str,
        property: &str,
        kind: PropertyKind,
    ) -> Result<bool, Error> {
        let type_id = self.node_type_id(type_name).await?;
        let property = property.to_string();
        let results = self
            .invoke_on_all(move |state| state.nodes.schema_add(type_id, &property, kind))
            .await?
            .into_iter()
            .collect::<Result<Vec<bool>, _>>()?;
        Ok(results.into_iter().last().unwrap_or(false))
    }

    pub async fn relationship_schema_add(
        &self,
        type_name: &str,
        property: &str,
        kind: PropertyKind,
    ) -> Result<bool, Error> {
        let type_id = self.relationship_type_id(type_name).await?;
        let property = property.to_string();
        let results = self
            .invoke_on_all(move |state| state.relationships.schema_add(type_id, &property, kind))
            .await?
            .into_iter()
            .collect::<Result<Vec<bool>, _>>()?;
        Ok(results.into_iter().last().unwrap_or(false))
    }

    // -- nodes ----------------------------------------------------------------

    /// Routes by `(type_name, key)`: the same pair always lands on the
    /// same shard, whether or not the node already exists.
    pub async fn add_node(
        &self,
        type_name: &str,
        key: &str,
        properties_json: &str,
    ) -> Result<u64, Error> {
        let type_id = self.node_type_id(type_name).await?;
        let shard = self.shard_of_key(type_name, key);
        let key = key.to_string();
        let properties_json = properties_json.to_string();
        Ok(self
            .handle(shard)
            .invoke(move |state| state.nodes.add(type_id, &key, &properties_json))
            .await??)
    }

    pub async fn find_node(&self, type_name: &str, key: &str) -> Result<Option<u64>, Error> {
        let type_id = self.node_type_id(type_name).await?;
        let shard = self.shard_of_key(type_name, key);
        let key = key.to_string();
        Ok(self
            .handle(shard)
            .invoke(move |state| state.nodes.get_id(type_id, &key))
            .await?)
    }

    pub async fn get_node(&self, id: u64) -> Result<Option<Node>, Error> {
        let shard = graph_id::shard_of(id);
        Ok(self.handle(shard).invoke(move |state| state.nodes.get(id)).await?)
    }

    /// Removes a node, then cascades the removal to every relationship
    /// that referenced it, on whichever shard each one lives.
    pub async fn remove_node(&self, id: u64) -> Result<Option<RemovedNode>, Error> {
        let shard = graph_id::shard_of(id);
        let removed = self
            .handle(shard)
            .invoke(move |state| state.nodes.remove(id))
            .await??;

        let Some(removed) = removed else {
            return Ok(None);
        };

        for &relationship_id in removed.outgoing.iter().chain(removed.incoming.iter()) {
            self.drop_relationship_edge(relationship_id).await?;
        }
        Ok(Some(removed))
    }

    async fn drop_relationship_edge(&self, relationship_id: u64) -> Result<(), Error> {
        let shard = graph_id::shard_of(relationship_id);
        let Some((start, end)) = self
            .handle(shard)
            .invoke(move |state| state.relationships.remove(relationship_id))
            .await??
        else {
            return Ok(());
        };

        let start_shard = graph_id::shard_of(start);
        self.handle(start_shard)
            .invoke(move |state| state.nodes.remove_outgoing(start, relationship_id))
            .await?;

        let end_shard = graph_id::shard_of(end);
        self.handle(end_shard)
            .invoke(move |state| state.nodes.remove_incoming(end, relationship_id))
            .await?;

        Ok(())
    }

    pub async fn get_node_property(
        &self,
        id: u64,
        name: &str,
    ) -> Result<Option<graph_property::TypedValue>, Error> {
        let shard = graph_id::shard_of(id);
        let name = name.to_string();
        Ok(self
            .handle(shard)
            .invoke(move |state| state.nodes.get_property(id, &name))
            .await?)
    }

    pub async fn set_node_property(&self, id: u64, name: &str, json_text: &str) -> Result<bool, Error> {
        let shard = graph_id::shard_of(id);
        let name = name.to_string();
        let json_text = json_text.to_string();
        Ok(self
            .handle(shard)
            .invoke(move |state| state.nodes.set_property_from_json(id, &name, &json_text))
            .await?)
    }

    pub async fn delete_node_property(&self, id: u64, name: &str) -> Result<bool, Error> {
        let shard = graph_id::shard_of(id);
        let name = name.to_string();
        Ok(self
            .handle(shard)
            .invoke(move |state| state.nodes.delete_property(id, &name))
            .await?)
    }

    pub async fn delete_all_node_properties(&self, id: u64) -> Result<bool, Error> {
        let shard = graph_id::shard_of(id);
        Ok(self
            .handle(shard)
            .invoke(move |state| state.nodes.delete_all_properties(id))
            .await?)
    }

    // -- relationships ----------------------------------------------------------

    /// Homed on `start`'s shard. Once created, the new relationship's
    /// id is pushed onto `start`'s outgoing list and `end`'s incoming
    /// list, which may be two different shards.
    ///
    /// Both endpoints must resolve to live nodes at creation time (§3,
    /// §4.4); `RelationshipStore::add` only checks that `start` is on
    /// the shard it's called on, so this is the one place that can see
    /// both endpoints and is responsible for checking both are live.
    pub async fn add_relationship(
        &self,
        type_name: &str,
        start: u64,
        end: u64,
        properties_json: &str,
    ) -> Result<u64, Error> {
        let type_id = self.relationship_type_id(type_name).await?;
        let start_shard = graph_id::shard_of(start);
        let end_shard = graph_id::shard_of(end);

        let start_live = self
            .handle(start_shard)
            .invoke(move |state| state.nodes.contains(start))
            .await?;
        if !start_live {
            return Err(Error::UnknownNode { id: start });
        }
        let end_live = self
            .handle(end_shard)
            .invoke(move |state| state.nodes.contains(end))
            .await?;
        if !end_live {
            return Err(Error::UnknownNode { id: end });
        }

        let properties_json = properties_json.to_string();

        let id = self
            .handle(start_shard)
            .invoke(move |state| {
                state
                    .relationships
                    .add_with_json(type_id, start, end, &properties_json)
            })
            .await??;

        if id == 0 {
            return Ok(0);
        }

        self.handle(start_shard)
            .invoke(move |state| state.nodes.add_outgoing(start, id))
            .await?;

        self.handle(end_shard)
            .invoke(move |state| state.nodes.add_incoming(end, id))
            .await?;

        Ok(id)
    }

    pub async fn get_relationship(&self, id: u64) -> Result<Option<Relationship>, Error> {
        let shard = graph_id::shard_of(id);
        Ok(self
            .handle(shard)
            .invoke(move |state| state.relationships.get(id))
            .await?)
    }

    pub async fn remove_relationship(&self, id: u64) -> Result<bool, Error> {
        let shard = graph_id::shard_of(id);
        let removed = self
            .handle(shard)
            .invoke(move |state| state.relationships.remove(id))
            .await??;

        let Some((start, end)) = removed else {
            return Ok(false);
        };

        let start_shard = graph_id::shard_of(start);
        self.handle(start_shard)
            .invoke(move |state| state.nodes.remove_outgoing(start, id))
            .await?;

        let end_shard = graph_id::shard_of(end);
        self.handle(end_shard)
            .invoke(move |state| state.nodes.remove_incoming(end, id))
            .await?;

        Ok(true)
    }

    pub async fn get_relationship_property(
        &self,
        id: u64,
        name: &str,
    ) -> Result<Option<graph_property::TypedValue>, Error> {
        let shard = graph_id::shard_of(id);
        let name = name.to_string();
        Ok(self
            .handle(shard)
            .invoke(move |state| state.relationships.get_property(id, &name))
            .await?)
    }

    pub async fn set_relationship_property(
        &self,
        id: u64,
        name: &str,
        json_text: &str,
    ) -> Result<bool, Error> {
        let shard = graph_id::shard_of(id);
        let name = name.to_string();
        let json_text = json_text.to_string();
        Ok(self
            .handle(shard)
            .invoke(move |state| state.relationships.set_property_from_json(id, &name, &json_text))
            .await?)
    }

    pub async fn delete_relationship_property(&self, id: u64, name: &str) -> Result<bool, Error> {
        let shard = graph_id::shard_of(id);
        let name = name.to_string();
        Ok(self
            .handle(shard)
            .invoke(move |state| state.relationships.delete_property(id, &name))
            .await?)
    }

    pub async fn delete_all_relationship_properties(&self, id: u64) -> Result<bool, Error> {
        let shard = graph_id::shard_of(id);
        Ok(self
            .handle(shard)
            .invoke(move |state| state.relationships.delete_all_properties(id))
            .await?)
    }

    /// Every outgoing relationship id currently adjacent to `id`.
    pub async fn outgoing(&self, id: u64) -> Result<Vec<u64>, Error> {
        let shard = graph_id::shard_of(id);
        Ok(self.handle(shard).invoke(move |state| state.nodes.outgoing(id)).await?)
    }

    pub async fn incoming(&self, id: u64) -> Result<Vec<u64>, Error> {
        let shard = graph_id::shard_of(id);
        Ok(self.handle(shard).invoke(move |state| state.nodes.incoming(id)).await?)
    }

    /// As [`Cluster::outgoing`], restricted to relationships of
    /// `type_name`. Unknown node or unknown type both yield an empty
    /// vector, never a partial or omitted result.
    pub async fn outgoing_by_type(&self, id: u64, type_name: &str) -> Result<Vec<u64>, Error> {
        let Some(rel_type) = self.relationship_type_id(type_name).await.ok() else {
            return Ok(Vec::new());
        };
        let shard = graph_id::shard_of(id);
        Ok(self
            .handle(shard)
            .invoke(move |state| state.nodes.outgoing_by_type(id, rel_type))
            .await?)
    }

    pub async fn incoming_by_type(&self, id: u64, type_name: &str) -> Result<Vec<u64>, Error> {
        let Some(rel_type) = self.relationship_type_id(type_name).await.ok() else {
            return Ok(Vec::new());
        };
        let shard = graph_id::shard_of(id);
        Ok(self
            .handle(shard)
            .invoke(move |state| state.nodes.incoming_by_type(id, rel_type))
            .await?)
    }
}
