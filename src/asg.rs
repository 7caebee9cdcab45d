//! Основные структуры Абстрактного Синтаксического Графа (ASG).
//!
//! Программа после разбора хранится как граф узлов. Граф неизменяем после
//! построения и разделяется между потоками через `Arc<ASG>`.

use crate::nodecodes::{EdgeType, NodeType};
use crate::parser::token::Span;
use serde::{Deserialize, Serialize};

/// Уникальный идентификатор узла в ASG.
pub type NodeID = u64;

/// Ребро графа, соединяющее узлы.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub edge_type: EdgeType,
    pub target_node_id: NodeID,
}

impl Edge {
    /// Создать новое ребро.
    pub fn new(edge_type: EdgeType, target_node_id: NodeID) -> Self {
        Self {
            edge_type,
            target_node_id,
        }
    }
}

/// Узел ASG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeID,
    pub node_type: NodeType,
    pub payload: Option<Vec<u8>>,
    pub edges: Vec<Edge>,
    /// Позиция в исходном коде (для сообщений об ошибках).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Node {
    /// Создать новый узел без рёбер.
    pub fn new(id: NodeID, node_type: NodeType, payload: Option<Vec<u8>>) -> Self {
        Self {
            id,
            node_type,
            payload,
            edges: Vec::new(),
            span: None,
        }
    }

    /// Создать узел с рёбрами.
    pub fn with_edges(id: NodeID, node_type: NodeType, payload: Option<Vec<u8>>, edges: Vec<Edge>) -> Self {
        Self {
            edges,
            ..Self::new(id, node_type, payload)
        }
    }

    /// Создать узел с рёбрами и span.
    pub fn with_edges_and_span(
        id: NodeID,
        node_type: NodeType,
        payload: Option<Vec<u8>>,
        edges: Vec<Edge>,
        span: Span,
    ) -> Self {
        Self {
            id,
            node_type,
            payload,
            edges,
            span: Some(span),
        }
    }

    /// Найти ребро по типу.
    pub fn find_edge(&self, edge_type: EdgeType) -> Option<&Edge> {
        self.edges.iter().find(|e| e.edge_type == edge_type)
    }

    /// Получить цели всех рёбер заданного типа.
    pub fn targets(&self, edge_type: EdgeType) -> Vec<NodeID> {
        self.edges
            .iter()
            .filter(|e| e.edge_type == edge_type)
            .map(|e| e.target_node_id)
            .collect()
    }

    /// Получить имя из payload (для Variable, Function и т.д.).
    pub fn get_name(&self) -> Option<String> {
        self.payload
            .as_ref()
            .and_then(|p| String::from_utf8(p.clone()).ok())
    }
}

/// Абстрактный Синтаксический Граф.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ASG {
    pub nodes: Vec<Node>,
}

impl ASG {
    /// Создать новый пустой ASG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить узел в граф.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Найти узел по ID.
    ///
    /// Построитель выдаёт ID подряд начиная с 1 и добавляет узлы в том же
    /// порядке, поэтому сначала проверяется позиция `id - 1`.
    pub fn find_node(&self, id: NodeID) -> Option<&Node> {
        let fast = id
            .checked_sub(1)
            .and_then(|idx| self.nodes.get(idx as usize))
            .filter(|n| n.id == id);
        fast.or_else(|| self.nodes.iter().find(|n| n.id == id))
    }

    /// Получить количество узлов.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Проверить, пуст ли граф.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Получить следующий свободный ID.
    pub fn next_id(&self) -> NodeID {
        self.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_node_sequential_and_sparse() {
        let mut asg = ASG::new();
        asg.add_node(Node::new(1, NodeType::LiteralNil, None));
        asg.add_node(Node::new(2, NodeType::LiteralNil, None));
        asg.add_node(Node::new(10, NodeType::LiteralNil, None));

        assert_eq!(asg.find_node(2).map(|n| n.id), Some(2));
        assert_eq!(asg.find_node(10).map(|n| n.id), Some(10));
        assert!(asg.find_node(0).is_none());
        assert!(asg.find_node(4).is_none());
        assert_eq!(asg.next_id(), 11);
    }

    #[test]
    fn test_node_targets_keep_order() {
        let node = Node::with_edges(
            5,
            NodeType::Block,
            None,
            vec![
                Edge::new(EdgeType::BlockStatement, 3),
                Edge::new(EdgeType::BlockStatement, 1),
                Edge::new(EdgeType::BlockStatement, 4),
            ],
        );
        assert_eq!(node.targets(EdgeType::BlockStatement), vec![3, 1, 4]);
        assert!(node.find_edge(EdgeType::LoopBody).is_none());
    }
}
